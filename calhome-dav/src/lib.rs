// utils
pub mod xml;

// webdav
pub mod types;

// acl
pub mod acltypes;
pub mod aclencoder;

// calendar dead properties
pub mod caltypes;
pub mod calencoder;

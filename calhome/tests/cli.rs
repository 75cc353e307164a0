use std::process::Command;

use anyhow::{bail, Result};

fn calhome_dev(args: &[&str]) -> Result<String> {
    let output = Command::new(env!("CARGO_BIN_EXE_calhome"))
        .env("RUST_LOG", "calhome=warn")
        .arg("--dev")
        .args(args)
        .output()?;
    if !output.status.success() {
        bail!(
            "calhome {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8(output.stdout)?)
}

#[test]
fn config_check() -> Result<()> {
    let out = calhome_dev(&["config", "check"])?;
    assert!(out.contains("/calendars/ serves users, groups, resources, locations, __uids__"));
    Ok(())
}

#[test]
fn list_users() -> Result<()> {
    let out = calhome_dev(&["tree", "list", "/calendars/users/"])?;
    let names: Vec<_> = out.lines().collect();
    assert_eq!(names, vec!["alice"]);
    Ok(())
}

#[test]
fn uids_are_not_listable() {
    assert!(calhome_dev(&["tree", "list", "/calendars/__uids__/"]).is_err());
}

#[test]
fn acl_as_xml() -> Result<()> {
    let out = calhome_dev(&["tree", "acl", "/calendars/users/alice/"])?;
    assert!(out.starts_with("<D:acl"));
    assert!(out.contains("<D:href>/principals/__uids__/f0e1d2c3-0001/</D:href>"));
    assert!(out.contains("calendar-proxy-write/"));
    Ok(())
}

#[test]
fn show_and_provision_home() -> Result<()> {
    let out = calhome_dev(&["tree", "show", "/calendars/locations/room1/"])?;
    assert!(out.contains("url: /calendars/__uids__/f0e1d2c3-0004/"));
    assert!(out.contains("full name: Meeting Room 1"));
    assert!(out.contains("children: inbox, outbox, dropbox, freebusy"));

    let out = calhome_dev(&["tree", "provision", "/calendars/users/alice/"])?;
    assert!(out.contains("url: /calendars/__uids__/f0e1d2c3-0001/calendar/"));
    assert!(out.contains("role: calendar"));
    assert!(out.contains("<C:opaque/>"));
    Ok(())
}

#[test]
fn provision_needs_a_home() {
    assert!(calhome_dev(&["tree", "provision", "/calendars/users/"]).is_err());
}

//! Filesystem discovery of attached printers.
//!
//! Discovery never errors: every failure mode, from a missing directory
//! to an unreadable attribute file, reads as "not found". The probes are
//! cheap enough to run unconditionally during auto-detection.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Probe a single well-known device node.
///
/// Used by families that pair out-of-band (e.g. a Bluetooth rfcomm
/// binding): presence of the node means pairing has already happened.
pub fn fixed_device(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

/// Resolve the character device behind a HID bus entry.
///
/// Walks `hid_root` for entries starting with `prefix` (the
/// `bus:vendor:product.` triple of the target device), descends into the
/// match's `hidraw` subtree for the kernel-assigned node, reads its `dev`
/// attribute (`major:minor`) and resolves that pair under `char_root`.
/// Multiple matches at any step pick the lexically first.
pub fn hid_chardev(hid_root: &Path, char_root: &Path, prefix: &str) -> Option<PathBuf> {
    let id = first_entry(hid_root, |name| name.starts_with(prefix))?;
    debug!("hid device id = {}", id);

    let hidraw_dir = hid_root.join(&id).join("hidraw");
    let node = first_entry(&hidraw_dir, |_| true)?;
    debug!("hidraw node = {}", node);

    let dev = fs::read_to_string(hidraw_dir.join(&node).join("dev")).ok()?;
    let dev = dev.trim();
    if !is_dev_pair(dev) {
        return None;
    }
    debug!("char dev id = {}", dev);

    fs::canonicalize(char_root.join(dev)).ok()
}

/// Lexically first directory entry matching the filter.
fn first_entry(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| matches(name))
        .collect();
    names.sort();
    names.into_iter().next()
}

/// `major:minor`, both plain decimal.
fn is_dev_pair(s: &str) -> bool {
    let mut parts = s.splitn(2, ':');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|c| c.is_ascii_digit())
                && minor.bytes().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "0003:0922:1002.";

    /// Build `<hid_root>/<id>/hidraw/<node>/dev` containing `dev_id`,
    /// plus the matching `<char_root>/<dev_id>` node.
    fn add_device(root: &TempDir, id: &str, node: &str, dev_id: &str) {
        let hidraw = root.path().join("hid").join(id).join("hidraw").join(node);
        fs::create_dir_all(&hidraw).unwrap();
        fs::write(hidraw.join("dev"), format!("{}\n", dev_id)).unwrap();

        let char_root = root.path().join("char");
        fs::create_dir_all(&char_root).unwrap();
        fs::write(char_root.join(dev_id), b"").unwrap();
    }

    fn probe(root: &TempDir) -> Option<PathBuf> {
        hid_chardev(&root.path().join("hid"), &root.path().join("char"), PREFIX)
    }

    #[test]
    fn fixed_path_probe() {
        let root = TempDir::new().unwrap();
        let node = root.path().join("rfcomm0");

        assert_eq!(fixed_device(&node), None);
        fs::write(&node, b"").unwrap();
        assert_eq!(fixed_device(&node), Some(node));
    }

    #[test]
    fn missing_root_is_not_found() {
        let root = TempDir::new().unwrap();
        assert_eq!(probe(&root), None);
    }

    #[test]
    fn no_matching_entry_is_not_found() {
        let root = TempDir::new().unwrap();
        add_device(&root, "0003:04F9:2044.0001", "hidraw0", "240:1");
        assert_eq!(probe(&root), None);
    }

    #[test]
    fn single_device_resolves() {
        let root = TempDir::new().unwrap();
        add_device(&root, "0003:0922:1002.0007", "hidraw2", "240:2");

        let found = probe(&root).unwrap();
        assert_eq!(
            found,
            fs::canonicalize(root.path().join("char").join("240:2")).unwrap()
        );
    }

    #[test]
    fn multiple_devices_pick_lexically_first() {
        let root = TempDir::new().unwrap();
        add_device(&root, "0003:0922:1002.000B", "hidraw5", "240:5");
        add_device(&root, "0003:0922:1002.0003", "hidraw1", "240:1");

        let found = probe(&root).unwrap();
        assert!(found.ends_with("240:1"));
    }

    #[test]
    fn malformed_dev_attribute_is_not_found() {
        let root = TempDir::new().unwrap();
        add_device(&root, "0003:0922:1002.0001", "hidraw0", "240:1");
        let dev = root
            .path()
            .join("hid/0003:0922:1002.0001/hidraw/hidraw0/dev");
        fs::write(dev, "not-a-pair\n").unwrap();

        assert_eq!(probe(&root), None);
    }

    #[test]
    fn dangling_char_node_is_not_found() {
        let root = TempDir::new().unwrap();
        add_device(&root, "0003:0922:1002.0001", "hidraw0", "240:1");
        fs::remove_file(root.path().join("char").join("240:1")).unwrap();

        assert_eq!(probe(&root), None);
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network interface not ready")]
    NotReady,
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
}

/// Whether the device can currently reach the internet. `NotReady` means the
/// networking stack itself is still coming up and is not a failure
pub trait Reachability {
    fn is_connected_to_internet(&self) -> Result<bool, NetworkError>;
}

/// Reachability from the kernel's view of one network interface
pub struct InterfaceStatus {
    root: PathBuf,
    iface: String,
}

impl InterfaceStatus {
    pub fn new(iface: &str) -> Self {
        Self::with_root("/sys/class/net", iface)
    }

    pub fn with_root(root: impl Into<PathBuf>, iface: &str) -> Self {
        Self {
            root: root.into(),
            iface: iface.to_string(),
        }
    }

    pub fn iface(&self) -> &str {
        &self.iface
    }
}

fn parse_operstate(state: &str) -> bool {
    state.trim() == "up"
}

impl Reachability for InterfaceStatus {
    fn is_connected_to_internet(&self) -> Result<bool, NetworkError> {
        let dir = self.root.join(&self.iface);
        if !dir.is_dir() {
            return Err(NetworkError::NotReady);
        }
        let state = std::fs::read_to_string(dir.join("operstate"))?;
        Ok(parse_operstate(&state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sphere-net-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn operstate_up_is_reachable() {
        let root = scratch("up");
        fs::create_dir(root.join("wlan0")).unwrap();
        fs::write(root.join("wlan0/operstate"), "up\n").unwrap();
        let status = InterfaceStatus::with_root(&root, "wlan0");
        assert!(status.is_connected_to_internet().unwrap());

        fs::write(root.join("wlan0/operstate"), "dormant\n").unwrap();
        assert!(!status.is_connected_to_internet().unwrap());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_interface_is_not_ready() {
        let root = scratch("missing");
        let status = InterfaceStatus::with_root(&root, "wlan0");
        assert!(matches!(
            status.is_connected_to_internet(),
            Err(NetworkError::NotReady)
        ));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn unreadable_state_is_an_error() {
        let root = scratch("noop");
        fs::create_dir(root.join("eth0")).unwrap();
        let status = InterfaceStatus::with_root(&root, "eth0");
        assert!(matches!(
            status.is_connected_to_internet(),
            Err(NetworkError::Io(_))
        ));
        fs::remove_dir_all(root).unwrap();
    }
}

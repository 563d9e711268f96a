use std::collections::BTreeSet;
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const START_MARKER: &str = "# BEGIN dockyard";
const END_MARKER: &str = "# END dockyard";

/// The dockyard-owned block of the system hosts file.
///
/// Everything outside the `# BEGIN dockyard` / `# END dockyard` markers is left
/// byte-for-byte untouched.
#[derive(Debug)]
pub struct HostsFileSection {
    path: PathBuf,
}

impl Default for HostsFileSection {
    fn default() -> Self {
        Self::new()
    }
}

impl HostsFileSection {
    #[must_use]
    pub fn new() -> Self {
        let path = if cfg!(windows) {
            PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
        } else {
            PathBuf::from("/etc/hosts")
        };
        Self { path }
    }

    #[must_use]
    pub const fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current file; a missing file reads as empty.
    pub async fn read(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Returns `current_content` with the dockyard block replaced by one
    /// loopback entry per hostname. Duplicates are dropped and names sorted so
    /// repeated runs produce identical files.
    #[must_use]
    pub fn update_content(&self, current_content: &str, hostnames: &[String]) -> String {
        let unique: BTreeSet<&str> = hostnames
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .collect();

        let mut section = String::new();
        section.push_str(START_MARKER);
        section.push('\n');
        for hostname in unique {
            let _ = writeln!(section, "127.0.0.1 {hostname}");
        }
        section.push_str(END_MARKER);

        if let Some(start) = current_content.find(START_MARKER)
            && let Some(end_idx) = current_content[start..].find(END_MARKER)
        {
            let end = start + end_idx;
            let mut output = String::from(&current_content[..start]);
            output.push_str(&section);
            output.push_str(&current_content[end + END_MARKER.len()..]);
            return output;
        }

        let mut output = String::from(current_content);
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&section);
        output.push('\n');
        output
    }

    pub async fn write(&self, content: &str) -> io::Result<()> {
        fs::write(&self.path, content).await
    }

    /// Read, rewrite the block, and write back only if something changed.
    ///
    /// Returns whether the file was modified.
    pub async fn sync(&self, hostnames: &[String]) -> io::Result<bool> {
        let current = self.read().await?;
        let updated = self.update_content(&current, hostnames);
        if updated == current {
            return Ok(false);
        }
        self.write(&updated).await?;
        Ok(true)
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::codec::SecretCodec;
    use crate::keys::KeyPrompt;

    /// A scratch namespace directory plus an environment that searches only
    /// there (no `HOME`, so search order is exactly the listed roots).
    pub struct TestNamespace {
        pub roots: Vec<TempDir>,
        pub dir: PathBuf,
        pub env: BTreeMap<String, String>,
        namespace: String,
    }

    impl TestNamespace {
        pub fn new(namespace: &str) -> Self {
            let root = TempDir::new().unwrap();
            let dir = root.path().join(namespace);
            fs::create_dir_all(&dir).unwrap();
            let env: BTreeMap<String, String> = [(
                "XDG_CONFIG_DIRS".to_string(),
                root.path().to_str().unwrap().to_string(),
            )]
            .into();
            Self {
                roots: vec![root],
                dir,
                env,
                namespace: namespace.to_string(),
            }
        }

        /// Append another search root containing the namespace directory,
        /// and return that directory.
        pub fn add_search_dir(&mut self) -> PathBuf {
            let root = TempDir::new().unwrap();
            let dir = root.path().join(&self.namespace);
            fs::create_dir_all(&dir).unwrap();
            let dirs = self.env.get_mut("XDG_CONFIG_DIRS").unwrap();
            dirs.push(':');
            dirs.push_str(root.path().to_str().unwrap());
            self.roots.push(root);
            dir
        }

        /// Write `name` in the namespace directory with secure permissions.
        pub fn write(&self, name: &str, content: &[u8]) {
            let path = self.dir.join(name);
            fs::write(&path, content).unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
            }
        }

        pub fn write_config(&self, yaml: &str) {
            self.write("config.yml", yaml.as_bytes());
        }

        pub fn write_secrets(&self, yaml: &str, key: &str) {
            let sealed = SecretCodec::new(key).unwrap().encrypt(yaml.as_bytes()).unwrap();
            self.write("secrets.yml", &sealed);
        }

        pub fn write_key(&self, key: &str) {
            self.write("master_key", key.as_bytes());
        }
    }

    /// Scripted [`KeyPrompt`] for tests.
    pub struct StubPrompt {
        pub interactive: bool,
        pub reply: Option<String>,
    }

    impl StubPrompt {
        pub fn replying(key: &str) -> Self {
            Self {
                interactive: true,
                reply: Some(key.to_string()),
            }
        }

        pub fn silent() -> Self {
            Self {
                interactive: false,
                reply: None,
            }
        }
    }

    impl KeyPrompt for StubPrompt {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn read_key(&mut self, _prompt: &str) -> io::Result<String> {
            self.reply
                .take()
                .ok_or_else(|| io::Error::other("no reply configured"))
        }
    }
}

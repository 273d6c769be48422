use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;

const CLIENT_ID_PREFIX: &str = "client_";
const CLIENT_ID_SUFFIX_LEN: usize = 8;
const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn generate_client_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CLIENT_ID_SUFFIX_LEN)
        .map(|_| BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())] as char)
        .collect();
    format!("{CLIENT_ID_PREFIX}{millis}_{suffix}")
}

#[derive(Debug)]
pub struct ClientIdentityStore {
    path: PathBuf,
    cached: OnceLock<String>,
}

impl ClientIdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: OnceLock::new(),
        }
    }

    pub fn client_id<F>(&self, log: F) -> &str
    where
        F: Fn(&str),
    {
        self.cached.get_or_init(|| match load_or_create(&self.path) {
            Ok(id) => id,
            Err(error) => {
                log(&format!(
                    "failed to persist client id at {}: {error}",
                    self.path.display()
                ));
                generate_client_id()
            }
        })
    }
}

fn load_or_create(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let generated = generate_client_id();
    fs::write(path, &generated)?;
    Ok(generated)
}

//! File-backed key/value store. One record per line, key and value hex
//! encoded and separated by a tab.

use crate::StorageConfig;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

const STORE_FILE: &str = "local.kv";

#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
    quota_bytes: usize,
}

impl KeyValueStore {
    pub fn open(config: &StorageConfig) -> Self {
        Self {
            path: config.root.join(STORE_FILE),
            quota_bytes: config.quota_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> PreviewResult<Option<String>> {
        let map = read_map(&self.path)?;
        Ok(map.get(key).cloned())
    }

    /// Stores `value` under `key`. Fails with `storage.quota_exceeded`,
    /// leaving the file untouched, when the store would outgrow its quota.
    pub fn set(&self, key: &str, value: &str) -> PreviewResult<()> {
        let mut map = read_map(&self.path)?;
        map.insert(key.to_owned(), value.to_owned());
        let used = used_bytes(&map);
        if used > self.quota_bytes {
            return Err(PreviewError::new(
                "storage.quota_exceeded",
                format!(
                    "writing `{key}` needs {used} bytes, quota is {}",
                    self.quota_bytes
                ),
            ));
        }
        write_map(&self.path, &map)
    }

    pub fn remove(&self, key: &str) -> PreviewResult<()> {
        let mut map = read_map(&self.path)?;
        if map.remove(key).is_none() {
            return Ok(());
        }

        if map.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|error| {
                    PreviewError::new(
                        "storage.remove_failed",
                        format!(
                            "failed removing empty store `{}`: {error}",
                            self.path.display()
                        ),
                    )
                })?;
            }
            return Ok(());
        }

        write_map(&self.path, &map)
    }

    /// Summed byte length of every key and value.
    pub fn used_bytes(&self) -> PreviewResult<usize> {
        Ok(used_bytes(&read_map(&self.path)?))
    }
}

fn used_bytes(map: &BTreeMap<String, String>) -> usize {
    map.iter()
        .map(|(key, value)| key.len().saturating_add(value.len()))
        .fold(0, usize::saturating_add)
}

fn read_map(path: &Path) -> PreviewResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|error| {
        PreviewError::new(
            "storage.read_failed",
            format!("failed to read store `{}`: {error}", path.display()),
        )
    })?;

    let mut map = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let (key_hex, value_hex) = line.split_once('\t').ok_or_else(|| {
            PreviewError::new(
                "storage.format_invalid",
                format!(
                    "invalid record format at `{}` line {}",
                    path.display(),
                    index + 1
                ),
            )
        })?;

        map.insert(decode_hex_string(key_hex)?, decode_hex_string(value_hex)?);
    }

    Ok(map)
}

fn write_map(path: &Path, map: &BTreeMap<String, String>) -> PreviewResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            PreviewError::new(
                "storage.dir_create_failed",
                format!(
                    "failed to create storage directory `{}`: {error}",
                    parent.display()
                ),
            )
        })?;
    }

    let mut encoded = String::new();
    for (key, value) in map {
        encoded.push_str(&encode_hex_string(key));
        encoded.push('\t');
        encoded.push_str(&encode_hex_string(value));
        encoded.push('\n');
    }

    fs::write(path, encoded).map_err(|error| {
        PreviewError::new(
            "storage.write_failed",
            format!("failed to write store `{}`: {error}", path.display()),
        )
    })
}

fn encode_hex_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len().saturating_mul(2));
    for byte in value.as_bytes() {
        out.push(hex_char(byte >> 4));
        out.push(hex_char(byte & 0x0f));
    }
    out
}

fn decode_hex_string(value: &str) -> PreviewResult<String> {
    let digits = value.as_bytes();
    if !digits.len().is_multiple_of(2) {
        return Err(PreviewError::new(
            "storage.hex_invalid",
            "hex field length must be even",
        ));
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks_exact(2) {
        bytes.push((decode_hex_nibble(pair[0])? << 4) | decode_hex_nibble(pair[1])?);
    }

    String::from_utf8(bytes).map_err(|error| {
        PreviewError::new(
            "storage.utf8_invalid",
            format!("stored field is not valid UTF-8: {error}"),
        )
    })
}

fn hex_char(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        10..=15 => (b'a' + (value - 10)) as char,
        _ => '0',
    }
}

fn decode_hex_nibble(byte: u8) -> PreviewResult<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(PreviewError::new(
            "storage.hex_invalid",
            format!("invalid hex character `{}`", char::from(byte)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::KeyValueStore;
    use super::decode_hex_string;
    use crate::test_support::temp_config;

    #[test]
    fn values_survive_reopening() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        assert!(store.set("html-editor-content", "<p>caf\u{e9}\ttab\nline</p>").is_ok());

        let reopened = KeyValueStore::open(&config);
        assert_eq!(
            reopened.get("html-editor-content"),
            Ok(Some("<p>caf\u{e9}\ttab\nline</p>".to_owned()))
        );
        assert_eq!(reopened.get("missing"), Ok(None));

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn quota_rejects_oversized_writes_without_touching_the_file() {
        let config = temp_config().with_quota(16);
        let store = KeyValueStore::open(&config);
        assert!(store.set("k", "small").is_ok());

        let error = match store.set("k2", "this value is far too large") {
            Ok(()) => panic!("write should exceed the quota"),
            Err(error) => error,
        };
        assert_eq!(error.code, "storage.quota_exceeded");
        assert_eq!(store.get("k2"), Ok(None));
        assert_eq!(store.used_bytes(), Ok(6));

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn removing_the_last_key_deletes_the_file() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        assert!(store.set("only", "1").is_ok());
        assert!(store.remove("only").is_ok());
        assert!(!store.path().exists());
        assert!(store.remove("only").is_ok());

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn malformed_hex_is_reported() {
        assert!(decode_hex_string("abc").is_err());
        assert!(decode_hex_string("zz").is_err());
        assert_eq!(decode_hex_string("6869"), Ok("hi".to_owned()));
    }
}

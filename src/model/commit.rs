use serde::{Deserialize, Serialize};

/// Record of one configuration file written by a save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveRecord {
    /// File that was written
    pub file: String,
    /// SHA-256 of the written content
    pub digest: String,
    /// Commit message attached to the save
    pub message: String,
    /// When the save happened
    pub saved_at: String, // ISO 8601 string
    /// Number of classes or objects stored in the file
    pub item_count: usize,
}

impl SaveRecord {
    pub fn new(file: &str, contents: &str, message: &str, saved_at: &str, item_count: usize) -> Self {
        Self {
            file: file.to_string(),
            digest: Self::calculate_digest(file, contents, message),
            message: message.to_string(),
            saved_at: saved_at.to_string(),
            item_count,
        }
    }

    fn calculate_digest(file: &str, contents: &str, message: &str) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(format!("file:{}\n", file));
        if !message.is_empty() {
            hasher.update(format!("message:{}\n", message));
        }
        hasher.update(format!("data:{}\n", contents));

        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_depends_on_content_and_message() {
        let saved_at = "2024-01-01T00:00:00+00:00";
        let first = SaveRecord::new("a.schema.xml", "<oks-schema/>", "init", saved_at, 0);
        let same = SaveRecord::new("a.schema.xml", "<oks-schema/>", "init", saved_at, 0);
        let other = SaveRecord::new("a.schema.xml", "<oks-schema/>", "second", saved_at, 0);

        assert_eq!(first.digest, same.digest);
        assert_ne!(first.digest, other.digest);
        assert_eq!(first.digest.len(), 64);
    }
}

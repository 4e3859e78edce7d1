// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session identifiers derived from input file names

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sketchmap_scoring::SessionKey;

use crate::error::{Result, StageError};

/// `<participant>_<condition>`, e.g. `adel_1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub participant: String,
    pub condition: u32,
}

impl SessionId {
    /// Split a file stem at its last underscore. The participant part may
    /// itself contain underscores.
    pub fn from_stem(stem: &str) -> Result<Self> {
        let invalid = || StageError::SessionName(stem.to_string());
        let (participant, condition) = stem.rsplit_once('_').ok_or_else(invalid)?;
        if participant.is_empty() {
            return Err(invalid());
        }
        let condition = condition.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            participant: participant.to_string(),
            condition,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StageError::SessionName(path.display().to_string()))?;
        Self::from_stem(stem)
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.participant.clone(), self.condition)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.participant, self.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_stem() {
        let id = SessionId::from_stem("adel_1").unwrap();
        assert_eq!(id.participant, "adel");
        assert_eq!(id.condition, 1);
        assert_eq!(id.to_string(), "adel_1");

        let id = SessionId::from_stem("p_07_3").unwrap();
        assert_eq!(id.participant, "p_07");
        assert_eq!(id.condition, 3);
    }

    #[test]
    fn test_invalid_stems() {
        for stem in ["adel", "adel_", "_2", "adel_x"] {
            assert!(
                matches!(SessionId::from_stem(stem), Err(StageError::SessionName(_))),
                "{stem} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_path() {
        let id = SessionId::from_path(&PathBuf::from("/data/sketches/mona_2.obj")).unwrap();
        assert_eq!(id.key(), SessionKey::new("mona", 2));
    }
}

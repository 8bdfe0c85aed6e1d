use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Evidence,
    Invoice,
    Incident,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Evidence,
        ArtifactKind::Invoice,
        ArtifactKind::Incident,
    ];
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ArtifactKind::Evidence => "evidence",
            ArtifactKind::Invoice => "invoice",
            ArtifactKind::Incident => "incident",
        };
        write!(f, "{}", kind)
    }
}

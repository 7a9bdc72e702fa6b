use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::{self, SiteCount};
use crate::hidden::Identified;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Groups,
    Influencer,
}

impl Visibility {
    pub fn display_name(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
            Visibility::Groups => "Group",
            Visibility::Influencer => "Influencer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Audio,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("note text must not be empty")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub dislikes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
}

impl Identified for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct Author {
    pub id: String,
    pub name: String,
}

/// A note as typed by the user, before it has an id or a canonical source.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub text: String,
    pub url: Option<String>,
    pub visibility: Visibility,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
}

impl NewNote {
    pub fn into_note(
        self,
        id: impl Into<String>,
        author: &Author,
        now: DateTime<Utc>,
    ) -> Result<Note, NoteError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(NoteError::EmptyText);
        }

        let media_url = self
            .media_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let media_type = media_url
            .as_ref()
            .map(|_| self.media_type.unwrap_or_default());
        let author_name = if author.name.trim().is_empty() {
            "Anonymous".to_string()
        } else {
            author.name.trim().to_string()
        };

        Ok(Note {
            id: id.into(),
            text: text.to_string(),
            url: canonical::note_source_url(self.url.as_deref()),
            visibility: self.visibility,
            author_id: author.id.clone(),
            author_name,
            created_at: now,
            media_url,
            media_type,
            likes_count: 0,
            dislikes_count: 0,
            comments_count: 0,
        })
    }
}

/// Reads a JSON array of notes, as exported from a feed.
pub fn load_notes(path: &Path) -> Result<Vec<Note>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file at {}", path.display()))?;
    let notes: Vec<Note> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse notes file at {}", path.display()))?;
    Ok(notes)
}

/// Most noted sites, counting public notes only.
pub fn public_sites(notes: &[Note], limit: usize) -> Vec<SiteCount> {
    canonical::top_sites(
        notes
            .iter()
            .filter(|note| note.visibility == Visibility::Public)
            .map(|note| note.url.as_str()),
        limit,
    )
}

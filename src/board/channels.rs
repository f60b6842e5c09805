//! Channel addressing by index or label.

use crate::error::{Error, FrameError, FrameField, Result};

/// A channel named either by its zero-based index or by its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Index(u8),
    Label(String),
}

impl From<u8> for ChannelRef {
    fn from(index: u8) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ChannelRef {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<String> for ChannelRef {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

/// Label table for one channel group; resolves [`ChannelRef`]s to indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    labels: Vec<String>,
    folded: Vec<String>,
}

impl ChannelMap {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.as_ref().to_owned()).collect(),
            folded: labels.iter().map(|l| l.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolve to a validated wire index. Labels match case-insensitively.
    pub fn resolve(&self, channel: &ChannelRef) -> Result<u8> {
        let index = match channel {
            ChannelRef::Index(index) => *index as usize,
            ChannelRef::Label(label) => {
                let folded = label.to_lowercase();
                self.folded
                    .iter()
                    .position(|l| *l == folded)
                    .ok_or_else(|| Error::UnknownLabel(label.clone()))?
            }
        };
        if index >= self.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.len(),
            });
        }
        u8::try_from(index).map_err(|_| {
            FrameError::InvalidByteValue {
                field: FrameField::Payload(0),
                value: index as u32,
            }
            .into()
        })
    }
}

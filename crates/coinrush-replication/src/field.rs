//! A replicated value with exactly one writer.

use coinrush_protocol::PlayerId;

use crate::ReplicationError;

/// A value every observer may read but only `owner` may write.
///
/// The ownership check runs before anything is touched, so a rejected
/// writer never produces a partial write.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicatedField<T> {
    owner: PlayerId,
    value: T,
}

impl<T> ReplicatedField<T> {
    pub fn new(owner: PlayerId, value: T) -> Self {
        Self { owner, value }
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Fails with [`ReplicationError::NotOwner`] unless `writer` owns the
    /// field.
    pub fn check_writer(&self, writer: PlayerId) -> Result<(), ReplicationError> {
        if writer == self.owner {
            Ok(())
        } else {
            Err(ReplicationError::NotOwner {
                writer,
                owner: self.owner,
            })
        }
    }

    /// Writes a new value on behalf of `writer` and returns the previous
    /// one.
    pub fn write(&mut self, writer: PlayerId, value: T) -> Result<T, ReplicationError> {
        self.check_writer(writer)?;
        Ok(std::mem::replace(&mut self.value, value))
    }

    /// Applies a value that already passed the check on the authority.
    /// Used by replicas, which receive writes rather than perform them.
    pub fn apply_remote(&mut self, value: T) -> T {
        std::mem::replace(&mut self.value, value)
    }
}

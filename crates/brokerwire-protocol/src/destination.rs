//! Destination types.
//!
//! The four concrete destination kinds each carry their own type code;
//! topic/queue and temporary capabilities are exposed as queries on the one
//! enum rather than an interface hierarchy.

use crate::command::type_codes;

/// A message destination, cache-eligible on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Point-to-point destination.
    Queue(String),
    /// Publish-subscribe destination.
    Topic(String),
    /// Connection-scoped point-to-point destination.
    TemporaryQueue(String),
    /// Connection-scoped publish-subscribe destination.
    TemporaryTopic(String),
}

impl Destination {
    /// Returns the concrete variant's type code.
    pub fn type_code(&self) -> u8 {
        match self {
            Destination::Queue(_) => type_codes::QUEUE,
            Destination::Topic(_) => type_codes::TOPIC,
            Destination::TemporaryQueue(_) => type_codes::TEMP_QUEUE,
            Destination::TemporaryTopic(_) => type_codes::TEMP_TOPIC,
        }
    }

    /// Returns the destination's physical name.
    pub fn physical_name(&self) -> &str {
        match self {
            Destination::Queue(name)
            | Destination::Topic(name)
            | Destination::TemporaryQueue(name)
            | Destination::TemporaryTopic(name) => name,
        }
    }

    /// True for publish-subscribe destinations.
    pub fn is_topic(&self) -> bool {
        matches!(self, Destination::Topic(_) | Destination::TemporaryTopic(_))
    }

    /// True for point-to-point destinations.
    pub fn is_queue(&self) -> bool {
        !self.is_topic()
    }

    /// True for destinations scoped to the lifetime of one connection.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Destination::TemporaryQueue(_) | Destination::TemporaryTopic(_))
    }

    /// Rebuilds a destination from a type code and physical name.
    ///
    /// Returns `None` if the code is not a destination code.
    pub fn from_type_code(code: u8, name: String) -> Option<Destination> {
        match code {
            type_codes::QUEUE => Some(Destination::Queue(name)),
            type_codes::TOPIC => Some(Destination::Topic(name)),
            type_codes::TEMP_QUEUE => Some(Destination::TemporaryQueue(name)),
            type_codes::TEMP_TOPIC => Some(Destination::TemporaryTopic(name)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let q = Destination::Queue("orders".into());
        assert!(q.is_queue() && !q.is_topic() && !q.is_temporary());

        let tt = Destination::TemporaryTopic("replies".into());
        assert!(tt.is_topic() && tt.is_temporary());
        assert_eq!(tt.physical_name(), "replies");
    }

    #[test]
    fn test_type_code_round_trip() {
        for d in [
            Destination::Queue("a".into()),
            Destination::Topic("b".into()),
            Destination::TemporaryQueue("c".into()),
            Destination::TemporaryTopic("d".into()),
        ] {
            let rebuilt =
                Destination::from_type_code(d.type_code(), d.physical_name().to_owned());
            assert_eq!(rebuilt.as_ref(), Some(&d));
        }
        assert!(Destination::from_type_code(99, "x".into()).is_none());
    }
}

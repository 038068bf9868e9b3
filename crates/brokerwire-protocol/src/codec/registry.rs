//! Type-code-indexed dispatch table.

use brokerwire_core::error::{ErrorKind, Result};

use super::marshaller::Marshaller;
use super::marshallers::{commands, destinations, ids};
use crate::command::{type_codes, Structure};

/// Maps each one-byte type code to its marshaller.
///
/// Built once per connection; the table is immutable afterwards, so it can
/// be shared freely across encode and decode paths.
pub struct MarshallerRegistry {
    slots: [Option<Box<dyn Marshaller>>; 256],
}

impl MarshallerRegistry {
    /// Builds the table with every supported structure type registered.
    pub fn new() -> Self {
        let mut registry = Self { slots: std::array::from_fn(|_| None) };
        registry.register(Box::new(commands::WireFormatInfoMarshaller));
        registry.register(Box::new(commands::ConnectionInfoMarshaller));
        registry.register(Box::new(commands::SessionInfoMarshaller));
        registry.register(Box::new(commands::ConsumerInfoMarshaller));
        registry.register(Box::new(commands::ProducerInfoMarshaller));
        registry.register(Box::new(commands::KeepAliveInfoMarshaller));
        registry.register(Box::new(commands::ShutdownInfoMarshaller));
        registry.register(Box::new(commands::RemoveInfoMarshaller));
        registry.register(Box::new(commands::ResponseMarshaller));
        registry.register(Box::new(commands::ExceptionResponseMarshaller));
        registry.register(Box::new(commands::MessageDispatchNotificationMarshaller));
        registry.register(Box::new(destinations::DestinationMarshaller::new(type_codes::QUEUE)));
        registry.register(Box::new(destinations::DestinationMarshaller::new(type_codes::TOPIC)));
        registry
            .register(Box::new(destinations::DestinationMarshaller::new(type_codes::TEMP_QUEUE)));
        registry
            .register(Box::new(destinations::DestinationMarshaller::new(type_codes::TEMP_TOPIC)));
        registry.register(Box::new(ids::MessageIdMarshaller));
        registry.register(Box::new(ids::ConnectionIdMarshaller));
        registry.register(Box::new(ids::SessionIdMarshaller));
        registry.register(Box::new(ids::ConsumerIdMarshaller));
        registry.register(Box::new(ids::ProducerIdMarshaller));
        registry.register(Box::new(ids::BrokerIdMarshaller));
        registry
    }

    fn register(&mut self, marshaller: Box<dyn Marshaller>) {
        let code = marshaller.type_code();
        debug_assert_eq!(
            marshaller.schema().type_code,
            Some(code),
            "marshaller and schema disagree on the type code"
        );
        self.slots[code as usize] = Some(marshaller);
    }

    /// Looks up the marshaller for a decoded type code.
    pub fn for_type_code(&self, code: u8) -> Result<&dyn Marshaller> {
        self.slots[code as usize]
            .as_deref()
            .ok_or(ErrorKind::UnknownTypeCode(code))
    }

    /// Looks up the marshaller for a structure about to be encoded.
    pub fn for_structure(&self, structure: &Structure) -> Result<&dyn Marshaller> {
        self.for_type_code(structure.type_code())
    }
}

impl Default for MarshallerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_every_schema_type_has_a_matching_marshaller() {
        let registry = MarshallerRegistry::new();
        for descriptor in schema::ALL {
            let code = descriptor.type_code.expect("concrete descriptor");
            let marshaller = registry.for_type_code(code).unwrap();
            assert_eq!(marshaller.type_code(), code);
            assert_eq!(marshaller.schema().type_code, Some(code), "{}", descriptor.name);
            assert_eq!(marshaller.schema().name, descriptor.name);
        }
    }

    #[test]
    fn test_unregistered_code_fails() {
        let registry = MarshallerRegistry::new();
        assert!(matches!(
            registry.for_type_code(0xEE),
            Err(ErrorKind::UnknownTypeCode(0xEE))
        ));
    }
}

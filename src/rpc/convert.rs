//! Conversions between the domain types (`Identifier`, `NodeDescriptor`) and
//! their wire counterparts generated from `proto/chord.proto`. Kept in one
//! place so every RPC handler and client call goes through the same
//! mapping.

use crate::chord_proto::NodeDescriptorMsg;
use crate::error::NodeError;
use crate::node::descriptor::NodeDescriptor;
use crate::node::identifier::{Identifier, RING_BITS};

pub fn identifier_to_bytes(id: &Identifier) -> Vec<u8> {
    id.to_bytes_be()
}

/// Parses a wire identifier. Rejects anything that isn't exactly the ring's
/// fixed width -- a request built against a different ring size, or simply
/// malformed, is an invalid-input error rather than silently truncated or
/// zero-padded into some other identifier.
pub fn identifier_from_bytes(bytes: &[u8]) -> Result<Identifier, NodeError> {
    let width = (RING_BITS / 8) as usize;
    if bytes.len() != width {
        return Err(NodeError::InvalidInput(format!(
            "expected a {}-byte identifier, got {} bytes",
            width,
            bytes.len()
        )));
    }
    Ok(Identifier::from_bytes_be(bytes))
}

pub fn descriptor_to_msg(descriptor: &NodeDescriptor) -> NodeDescriptorMsg {
    NodeDescriptorMsg {
        id: identifier_to_bytes(&descriptor.id),
        address: descriptor.address.clone(),
    }
}

/// Unlike [`identifier_from_bytes`], this never rejects malformed width: a
/// descriptor's id is never the caller-supplied lookup key the spec's
/// invalid-input handling is about, only another node's own self-reported
/// identity, always produced by [`descriptor_to_msg`] on its end.
pub fn descriptor_from_msg(msg: &NodeDescriptorMsg) -> NodeDescriptor {
    NodeDescriptor::from_parts(Identifier::from_bytes_be(&msg.id), msg.address.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_identifier_through_the_wire_format() {
        let id = Identifier::from_address("127.0.0.1:9000");
        let bytes = identifier_to_bytes(&id);
        assert_eq!(identifier_from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn rejects_an_identifier_of_the_wrong_width() {
        assert!(identifier_from_bytes(&[0u8; 10]).is_err());
        assert!(identifier_from_bytes(&[]).is_err());
    }
}

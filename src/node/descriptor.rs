//! Node descriptors: the `(id, address)` pair that is passed around by value
//! everywhere in the ring — finger entries, successor/predecessor pointers,
//! RPC request/response payloads.

use std::fmt;

use crate::node::identifier::Identifier;

/// A `(id, address)` pair identifying a node. Peer identity is the address;
/// the id is always recomputable from it via [`Identifier::from_address`],
/// but we carry it alongside so hot paths (interval checks, finger refresh)
/// never recompute a hash.
#[derive(Clone, Eq, PartialEq)]
pub struct NodeDescriptor {
    pub id: Identifier,
    pub address: String,
}

impl NodeDescriptor {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let id = Identifier::from_address(&address);
        NodeDescriptor { id, address }
    }

    pub fn from_parts(id: Identifier, address: impl Into<String>) -> Self {
        NodeDescriptor {
            id,
            address: address.into(),
        }
    }
}

impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish()
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_recomputed_from_address() {
        let a = NodeDescriptor::new("127.0.0.1:9000");
        let b = NodeDescriptor::new("127.0.0.1:9000");
        assert_eq!(a.id, b.id);
        assert_eq!(a, b);
    }
}

//! Namespace Resolution
//!
//! Stack-based namespace resolver for XML namespace handling.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI); a `uri_id` of 0 undeclares the default
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u32,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u32,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
    xml_uri_id: u32,
    xmlns_uri_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
            xml_uri_id,
            xmlns_uri_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope (prefix 0 is the default namespace)
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> Result<(), &'static str> {
        if prefix_id == self.xmlns_prefix_id {
            return Err("The 'xmlns' prefix must not be declared");
        }
        if prefix_id == self.xml_prefix_id {
            if uri_id != self.xml_uri_id {
                return Err("The 'xml' prefix cannot be bound to another namespace");
            }
            return Ok(());
        }
        if uri_id == self.xml_uri_id || uri_id == self.xmlns_uri_id {
            return Err("Reserved namespace URI cannot be bound to another prefix");
        }
        if uri_id == 0 && prefix_id != 0 {
            return Err("A namespace prefix cannot be undeclared");
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
        Ok(())
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
            .filter(|&uri| uri != 0)
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);

        let xml_id = strings.intern("xml");
        assert!(resolver.resolve(xml_id).is_some());
        assert!(resolver.resolve_default().is_none());
    }

    #[test]
    fn test_scope_pop() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let prefix = strings.intern("foo");
        let uri = strings.intern("http://example.com/foo");

        resolver.push_scope();
        resolver.declare(prefix, uri).unwrap();
        assert_eq!(resolver.resolve(prefix), Some(uri));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), None);
    }

    #[test]
    fn test_shadow_and_undeclare_default() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let uri = strings.intern("http://example.com/ns1");

        resolver.push_scope();
        resolver.declare(0, uri).unwrap();
        assert_eq!(resolver.resolve_default(), Some(uri));

        resolver.push_scope();
        resolver.declare(0, 0).unwrap();
        assert_eq!(resolver.resolve_default(), None);

        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), Some(uri));
    }

    #[test]
    fn test_reserved_prefixes() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let xmlns = strings.intern("xmlns");
        let xml = strings.intern("xml");
        let other = strings.intern("urn:other");
        let p = strings.intern("p");
        assert!(resolver.declare(xmlns, other).is_err());
        assert!(resolver.declare(xml, other).is_err());
        assert!(resolver.declare(p, 0).is_err());
    }
}

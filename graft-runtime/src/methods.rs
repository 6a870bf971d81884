use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use graft_code::MethodId;

use crate::code::{Code, CodeId, CodeObjects};

struct MethodData {
    name: String,
    installed: Option<CodeId>,
}

/// Method-identity registry doubling as the compilation database:
/// every method named by a compiled unit must resolve here, and a
/// successful install publishes the method -> code mapping.
pub struct MethodTable {
    inner: Mutex<Vec<MethodData>>,
    by_name: Mutex<HashMap<String, MethodId>>,
}

impl MethodTable {
    pub fn new() -> MethodTable {
        MethodTable {
            inner: Mutex::new(Vec::new()),
            by_name: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_method(&self, name: impl Into<String>) -> MethodId {
        let name = name.into();
        let mut inner = self.inner.lock();
        let id = MethodId(inner.len() as u32);
        inner.push(MethodData {
            name: name.clone(),
            installed: None,
        });
        self.by_name.lock().insert(name, id);
        id
    }

    pub fn resolve(&self, method: MethodId) -> Option<String> {
        let inner = self.inner.lock();
        inner.get(method.0 as usize).map(|data| data.name.clone())
    }

    pub fn lookup(&self, name: &str) -> Option<MethodId> {
        self.by_name.lock().get(name).copied()
    }

    pub fn is_known(&self, method: MethodId) -> bool {
        (method.0 as usize) < self.inner.lock().len()
    }

    pub(crate) fn set_installed_code(&self, method: MethodId, code_id: CodeId) {
        let mut inner = self.inner.lock();
        inner[method.0 as usize].installed = Some(code_id);
    }

    pub fn installed_code_id(&self, method: MethodId) -> Option<CodeId> {
        let inner = self.inner.lock();
        inner.get(method.0 as usize).and_then(|data| data.installed)
    }

    pub fn installed_code(&self, method: MethodId, code_objects: &CodeObjects) -> Option<Arc<Code>> {
        self.installed_code_id(method)
            .map(|code_id| code_objects.get(code_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_resolve() {
        let table = MethodTable::new();
        let id = table.add_method("Foo.bar()");

        assert_eq!(table.resolve(id), Some("Foo.bar()".to_string()));
        assert_eq!(table.lookup("Foo.bar()"), Some(id));
        assert!(table.resolve(MethodId(17)).is_none());
        assert!(!table.is_known(MethodId(17)));
    }

    #[test]
    fn test_no_code_before_install() {
        let table = MethodTable::new();
        let id = table.add_method("Foo.bar()");
        assert!(table.installed_code_id(id).is_none());
    }
}

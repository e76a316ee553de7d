use std::collections::HashMap;

/// Interned names with codes handed out in first-seen order.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    next_code: u32,
    names: Vec<String>,
    codes: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new(first_code: u32) -> Self {
        Self {
            next_code: first_code,
            names: Vec::new(),
            codes: HashMap::new(),
        }
    }

    /// Code for `name`, assigning the next free one on first sight.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(code) = self.codes.get(name) {
            return *code;
        }
        let code = self.next_code;
        self.next_code += 1;
        self.names.push(name.to_string());
        self.codes.insert(name.to_string(), code);
        code
    }

    /// Names in the order they were first interned.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

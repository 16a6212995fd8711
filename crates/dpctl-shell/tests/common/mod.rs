#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use dpctl_shell::{
    split_word, BindError, InternalError, ShellResult, SyntaxToken, TypeDescriptor, TypeResolver,
    Value,
};

/// A small type library: worker ids, port names, gates and hosts.
#[derive(Default)]
pub struct TestTypes {
    pub workers: Vec<String>,
    pub ports: Vec<String>,
}

impl TestTypes {
    pub fn new() -> Self {
        Self {
            workers: vec!["0".into(), "1".into(), "3".into()],
            ports: vec!["pmd0".into(), "pmd1".into(), "vhost".into()],
        }
    }
}

impl TypeResolver for TestTypes {
    fn resolve(&self, token: &SyntaxToken, _partial: &str) -> Option<TypeDescriptor> {
        let desc = match token.raw() {
            "WORKER_ID" => TypeDescriptor::new("int", "worker id").with_candidates(self.workers.clone()),
            "WORKER_ID..." => TypeDescriptor::new("wid+", "one or more worker IDs")
                .with_candidates(self.workers.clone()),
            "PORT" => TypeDescriptor::new("name", "name of a port").with_candidates(self.ports.clone()),
            "PORT..." => TypeDescriptor::new("name+", "one or more port names")
                .with_candidates(self.ports.clone()),
            "GATE" | "[GATE]" | "[OGATE]" => TypeDescriptor::new("gate", "gate index of a module"),
            "[HOST]" => TypeDescriptor::new("host", "host address"),
            "[TCP_PORT]" => TypeDescriptor::new("int", "TCP port"),
            "MYSTERY" => TypeDescriptor::new("mystery", "declared by the resolver only"),
            _ => return None,
        };
        Some(desc)
    }

    fn split<'a>(&self, type_name: &str, text: &'a str) -> Result<(&'a str, &'a str), InternalError> {
        match type_name {
            "keyword" | "int" | "name" | "gate" | "host" => Ok(split_word(text)),
            "wid+" | "name+" => Ok((text, "")),
            other => Err(InternalError::undefined_type(other)),
        }
    }

    fn bind(&self, type_name: &str, text: &str) -> ShellResult<Value> {
        match type_name {
            "keyword" => Ok(Value::Absent),
            "int" => text
                .parse()
                .map(Value::Int)
                .map_err(|_| BindError::new("int", "Expected an integer").into()),
            "gate" => {
                if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
                    Ok(Value::Int(text.parse().map_err(|_| BindError::new("gate", "gate out of range"))?))
                } else {
                    Err(BindError::new("gate", "\"gate\" must be a positive number").into())
                }
            }
            "wid+" => {
                let mut ids = text
                    .split_whitespace()
                    .map(|w| {
                        w.parse::<i64>()
                            .ok()
                            .filter(|v| *v >= 0)
                            .ok_or_else(|| BindError::new("wid+", "\"wid\" must be a positive number"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ids.sort_unstable();
                ids.dedup();
                Ok(Value::IntList(ids))
            }
            "name" | "host" => Ok(Value::Str(text.to_string())),
            "name+" => {
                let mut names: Vec<String> = text.split_whitespace().map(str::to_string).collect();
                names.sort();
                names.dedup();
                Ok(Value::List(names))
            }
            other => Err(InternalError::undefined_type(other).into()),
        }
    }
}

/// A cloneable in-memory writer for capturing console output.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

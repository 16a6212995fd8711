//! The console's variable types: which grammar tokens are variables, how much
//! input each one takes, and how that input becomes a [`Value`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use dpctl_shell::{
    split_word, BindError, InternalError, ShellResult, SyntaxToken, TypeDescriptor, TypeResolver,
    Value, KEYWORD,
};
use regex::Regex;
use serde_json::Value as Json;

use crate::control::ControlPlane;

/// Types that take exactly one word.
const ONE_WORD: &[&str] = &[
    KEYWORD,
    "int",
    "name",
    "optional_name",
    "gate",
    "socket",
    "endis",
    "dir",
    "pause_workers",
    "host",
    "filename",
    "confname",
];

/// Types that take the rest of the line.
const REST_OF_LINE: &[&str] = &["name+", "wid+", "map", "literal", "opts"];

const NAME_RULE: &str = "\"name\" must be [_a-zA-Z][_a-zA-Z0-9]*";

struct Patterns {
    name: Regex,
    optional_name: Regex,
    dns: Regex,
    ipv4: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            name: Regex::new(r"^[_a-zA-Z]\w*$")?,
            optional_name: Regex::new(r"^(\*|[_a-zA-Z]\w*)$")?,
            dns: Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-.]*$")?,
            ipv4: Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$")?,
        })
    }
}

/// Resolver for the dpctl grammar. Live candidates (workers, ports, ...) are
/// fetched from the control plane on every call; a failing or disconnected
/// control plane just yields no candidates.
pub struct StandardTypes {
    control: Rc<dyn ControlPlane>,
    patterns: Patterns,
}

impl StandardTypes {
    pub fn new(control: Rc<dyn ControlPlane>) -> Result<Self, InternalError> {
        let patterns =
            Patterns::compile().map_err(|e| InternalError::new(format!("bad type pattern: {e}")))?;
        Ok(Self { control, patterns })
    }

    fn worker_ids(&self) -> Vec<String> {
        self.control
            .list_workers()
            .map(|ws| ws.iter().map(|w| w.wid.to_string()).collect())
            .unwrap_or_default()
    }

    fn driver_names(&self) -> Vec<String> {
        self.control
            .list_drivers()
            .map(|ds| ds.into_iter().map(|d| d.name).collect())
            .unwrap_or_default()
    }

    fn mclass_names(&self) -> Vec<String> {
        self.control
            .list_mclasses()
            .map(|ms| ms.into_iter().map(|m| m.name).collect())
            .unwrap_or_default()
    }

    fn module_names(&self) -> Vec<String> {
        self.control
            .list_modules()
            .map(|ms| ms.into_iter().map(|m| m.name).collect())
            .unwrap_or_default()
    }

    fn port_names(&self) -> Vec<String> {
        self.control
            .list_ports()
            .map(|ps| ps.into_iter().map(|p| p.name).collect())
            .unwrap_or_default()
    }

    fn tc_names(&self) -> Vec<String> {
        self.control
            .list_tcs(None)
            .map(|tcs| tcs.into_iter().map(|tc| tc.name).collect())
            .unwrap_or_default()
    }

    fn check_name(&self, text: &str) -> Result<(), BindError> {
        if self.patterns.name.is_match(text) {
            Ok(())
        } else {
            Err(BindError::new("name", NAME_RULE))
        }
    }
}

impl TypeResolver for StandardTypes {
    fn resolve(&self, token: &SyntaxToken, partial_word: &str) -> Option<TypeDescriptor> {
        let desc = match token.raw() {
            "ENABLE_DISABLE" => TypeDescriptor::new("endis", "").with_candidates(["enable", "disable"]),
            "CORE" => TypeDescriptor::new("int", ""),
            "[SOCKET]" => TypeDescriptor::new("socket", ""),
            "WORKER_ID" => TypeDescriptor::new("int", "").with_candidates(self.worker_ids()),
            "WORKER_ID..." => TypeDescriptor::new("wid+", "one or more worker IDs")
                .with_candidates(self.worker_ids()),
            "DRIVER" => TypeDescriptor::new("name", "name of a port driver")
                .with_candidates(self.driver_names()),
            "DRIVER..." => TypeDescriptor::new("name+", "one or more port driver names")
                .with_candidates(self.driver_names()),
            "MCLASS" => TypeDescriptor::new("name", "name of a module class")
                .with_candidates(self.mclass_names()),
            "MCLASS..." => TypeDescriptor::new("name+", "one or more module class names")
                .with_candidates(self.mclass_names()),
            "[NEW_MODULE]" => TypeDescriptor::new("name", "specify a name of the new module instance"),
            "MODULE" => TypeDescriptor::new("name", "name of an existing module instance")
                .with_candidates(self.module_names()),
            "[MODULE]" => {
                let mut candidates = vec!["*".to_string()];
                candidates.extend(self.module_names());
                TypeDescriptor::new("optional_name", "name of an existing module instance (* means all)")
                    .with_candidates(candidates)
            }
            "MODULE..." => TypeDescriptor::new("name+", "one or more module names")
                .with_candidates(self.module_names()),
            "[NEW_PORT]" => TypeDescriptor::new("name", "specify a name of the new port"),
            "PORT" => TypeDescriptor::new("name", "name of a port").with_candidates(self.port_names()),
            "PORT..." => TypeDescriptor::new("name+", "one or more port names")
                .with_candidates(self.port_names()),
            "TC..." => TypeDescriptor::new("name+", "one or more traffic class names")
                .with_candidates(self.tc_names()),
            "CONF_FILE" => TypeDescriptor::new("filename", "configuration filename")
                .with_candidates(complete_filename(partial_word)),
            "[DIRECTION]" => TypeDescriptor::new("dir", "gate direction discriminator (default \"out\")")
                .with_candidates(["in", "out"]),
            "[GATE]" => TypeDescriptor::new("gate", "gate index of a module"),
            "[OGATE]" => TypeDescriptor::new("gate", "output gate of a module (default 0)"),
            "[IGATE]" => TypeDescriptor::new("gate", "input gate of a module (default 0)"),
            "[PORT_ARGS...]" => TypeDescriptor::new("map", "initial configuration for port"),
            "[MODULE_ARGS...]" => TypeDescriptor::new("literal", "initial configuration for module"),
            "[HOST]" => TypeDescriptor::new("host", "host address"),
            "[TCP_PORT]" => TypeDescriptor::new("int", "TCP port"),
            "[PAUSE_WORKERS]" => TypeDescriptor::new(
                "pause_workers",
                "determines whether to pause workers for the operation (default: \"pause\")",
            )
            .with_candidates(["pause", "no_pause"]),
            "[TCPDUMP_OPTS...]" => TypeDescriptor::new(
                "opts",
                "tcpdump(1) command-line options (e.g., \"-ne tcp port 22\")",
            ),
            _ => return None,
        };
        Some(desc)
    }

    fn split<'a>(&self, type_name: &str, text: &'a str) -> Result<(&'a str, &'a str), InternalError> {
        if ONE_WORD.contains(&type_name) {
            Ok(split_word(text))
        } else if REST_OF_LINE.contains(&type_name) {
            Ok((text, ""))
        } else {
            Err(InternalError::undefined_type(type_name))
        }
    }

    fn bind(&self, type_name: &str, text: &str) -> ShellResult<Value> {
        let value = match type_name {
            KEYWORD => Value::Absent,
            "int" => text
                .parse()
                .map(Value::Int)
                .map_err(|_| BindError::new("int", "Expected an integer"))?,
            "name" => {
                self.check_name(text)?;
                Value::Str(text.to_string())
            }
            "optional_name" => {
                if !self.patterns.optional_name.is_match(text) {
                    return Err(BindError::new(
                        "optional_name",
                        "\"name\" must be \"*\" or [_a-zA-Z][_a-zA-Z0-9]*",
                    )
                    .into());
                }
                Value::Str(text.to_string())
            }
            "gate" | "socket" => Value::Int(parse_index(type_name, text)?),
            "endis" => Value::Str(
                pick_prefix(text, &["enable", "disable"])
                    .ok_or_else(|| BindError::new("endis", "\"endis\" must be either \"enable\" or \"disable\""))?
                    .to_string(),
            ),
            "dir" => Value::Str(
                pick_prefix(text, &["in", "out"])
                    .ok_or_else(|| BindError::new("dir", "\"dir\" must be either \"in\" or \"out\""))?
                    .to_string(),
            ),
            "pause_workers" => match text {
                "pause" | "no_pause" => Value::Str(text.to_string()),
                _ => {
                    return Err(BindError::new(
                        "pause_workers",
                        "\"pause_workers\" must be either \"pause\" or \"no_pause\"",
                    )
                    .into())
                }
            },
            "host" => {
                if !self.patterns.dns.is_match(text) && !self.patterns.ipv4.is_match(text) {
                    return Err(BindError::new(
                        "host",
                        "\"host\" must be a valid DNS name or IPv4 address",
                    )
                    .into());
                }
                Value::Str(text.to_string())
            }
            "filename" | "confname" => {
                if text.contains('\0') {
                    let message = if type_name == "filename" {
                        "Invalid filename"
                    } else {
                        "Invalid configuration name"
                    };
                    return Err(BindError::new(type_name, message).into());
                }
                Value::Str(text.to_string())
            }
            "wid+" => {
                let mut ids = text
                    .split_whitespace()
                    .map(|w| parse_index("wid", w))
                    .collect::<Result<Vec<_>, _>>()?;
                ids.sort_unstable();
                ids.dedup();
                Value::IntList(ids)
            }
            "name+" => {
                let mut names: Vec<String> = text.split_whitespace().map(str::to_string).collect();
                names.sort();
                names.dedup();
                for name in &names {
                    self.check_name(name)?;
                }
                Value::List(names)
            }
            "map" => Value::Map(parse_map(text)?),
            "literal" => {
                let text = text.trim();
                if text.is_empty() {
                    Value::Absent
                } else {
                    serde_json::from_str(text).map(Value::Json).map_err(|_| {
                        BindError::new(
                            "literal",
                            "\"literal\" should be a JSON value \
                             (e.g., 42, \"foo\", [\"hello\", \"world\"], {\"bar\": \"baz\"})",
                        )
                    })?
                }
            }
            "opts" => Value::List(text.split_whitespace().map(str::to_string).collect()),
            other => return Err(InternalError::undefined_type(other).into()),
        };
        Ok(value)
    }
}

fn parse_index(type_name: &str, text: &str) -> Result<i64, BindError> {
    let positive = || BindError::new(type_name, format!("\"{type_name}\" must be a positive number"));
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(positive());
    }
    text.parse().map_err(|_| positive())
}

/// First of `choices` that `text` is a prefix of.
fn pick_prefix<'c>(text: &str, choices: &[&'c str]) -> Option<&'c str> {
    if text.is_empty() {
        return None;
    }
    choices.iter().copied().find(|c| c.starts_with(text))
}

/// `key=value, key=value, ...`. Values are JSON; anything that does not
/// parse as JSON is kept as a string.
fn parse_map(text: &str) -> Result<BTreeMap<String, Json>, BindError> {
    let malformed = || BindError::new("map", "\"map\" should be \"key=val, key=val, ...\"");
    let mut map = BTreeMap::new();

    for item in split_top_level(text) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (key, value) = item.split_once('=').ok_or_else(malformed)?;
        let key = key.trim();
        let value = value.trim();
        let key_ok = key
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
            && key.chars().all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !key_ok || value.is_empty() {
            return Err(malformed());
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Json::String(value.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Split on commas that are not nested in brackets or string literals.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// File-name candidates for `partial`, relative to the directory part of the
/// word. Directories carry a trailing `/`; dot entries are offered only when
/// the typed name starts with a dot.
pub fn complete_filename(partial: &str) -> Vec<String> {
    let (sub_dir, base) = match partial.rfind('/') {
        Some(pos) => partial.split_at(pos + 1),
        None => ("", partial),
    };

    let target = if sub_dir.is_empty() {
        ".".to_string()
    } else if let Some(rest) = sub_dir.strip_prefix("~/") {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(rest).to_string_lossy().into_owned(),
            None => sub_dir.to_string(),
        }
    } else {
        sub_dir.to_string()
    };

    let Ok(entries) = fs::read_dir(&target) else {
        return Vec::new();
    };

    let mut names: Vec<(String, bool)> = entries
        .filter_map(Result::ok)
        .map(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (entry.file_name().to_string_lossy().into_owned(), is_dir)
        })
        .collect();
    names.push((".".to_string(), true));
    names.push(("..".to_string(), true));

    let mut candidates: Vec<String> = names
        .into_iter()
        .filter(|(name, _)| !name.starts_with('.') || base.starts_with('.'))
        .filter(|(name, _)| !name.contains(char::is_whitespace))
        .filter(|(name, _)| name.starts_with(base))
        .map(|(name, is_dir)| {
            let slash = if is_dir { "/" } else { "" };
            format!("{sub_dir}{name}{slash}")
        })
        .collect();
    candidates.sort();
    candidates
}

//! Named HTML templates with a small placeholder language.
//!
//! Supported actions:
//! - `{{ .a.b }}` looks up a dotted path in the data (`{{ . }}` is the data itself)
//! - `{{ func .a }}` applies a registered function to the value at the path
//! - `{{ range .items }} ... {{ end }}` repeats the body with `.` bound to each element
//!
//! Output of every action is HTML-escaped.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Template rendering and loading errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template registered under this name.
    #[error("template '{0}' is not defined")]
    NotFound(String),

    /// An action calls a function missing from the function map.
    #[error("template '{template}' calls unknown function '{function}'")]
    UnknownFunction { template: String, function: String },

    /// Template source could not be parsed.
    #[error("template '{template}': {reason}")]
    Syntax { template: String, reason: String },

    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Glob pattern was invalid or a matched entry was unreadable.
    #[error("invalid template glob: {0}")]
    Glob(String),
}

type TemplateFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Functions callable from template actions, by name.
#[derive(Clone, Default)]
pub struct FuncMap(HashMap<String, TemplateFn>);

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.0.insert(name.into(), Arc::new(func));
        self
    }

    fn get(&self, name: &str) -> Option<&TemplateFn> {
        self.0.get(name)
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.0.keys().collect();
        names.sort();
        f.debug_tuple("FuncMap").field(&names).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Action {
    func: Option<String>,
    path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Action(Action),
    Range { path: Vec<String>, body: Vec<Node> },
}

/// Template store shared by every request of an engine.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    templates: HashMap<String, Vec<Node>>,
    funcs: FuncMap,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register `source` under `name`, replacing any previous one.
    pub fn add(&mut self, name: impl Into<String>, source: &str) -> Result<(), RenderError> {
        let name = name.into();
        let nodes = parse(&name, source)?;
        self.templates.insert(name, nodes);
        Ok(())
    }

    /// Load every file matching `pattern`, each named by its file name.
    ///
    /// Returns the number of templates loaded.
    pub fn load_glob(&mut self, pattern: &str) -> Result<usize, RenderError> {
        let paths = glob::glob(pattern).map_err(|e| RenderError::Glob(e.to_string()))?;
        let mut loaded = 0;
        for entry in paths {
            let path = entry.map_err(|e| RenderError::Glob(e.to_string()))?;
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            tracing::debug!(template = %name, path = %path.display(), "Loaded template");
            self.add(name, &source)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn set_func_map(&mut self, funcs: FuncMap) {
        self.funcs = funcs;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render the template `name` against `data`.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::NotFound(name.to_string()))?;
        let mut out = String::new();
        self.render_nodes(name, nodes, data, &mut out)?;
        Ok(out)
    }

    fn render_nodes(&self, name: &str, nodes: &[Node], data: &Value, out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(action) => {
                    let value = lookup(data, &action.path);
                    let text = match &action.func {
                        Some(func) => {
                            let f = self.funcs.get(func).ok_or_else(|| RenderError::UnknownFunction {
                                template: name.to_string(),
                                function: func.clone(),
                            })?;
                            f(value.unwrap_or(&Value::Null))
                        }
                        None => value.map(display).unwrap_or_default(),
                    };
                    out.push_str(&escape_html(&text));
                }
                Node::Range { path, body } => match lookup(data, path) {
                    Some(Value::Array(items)) => {
                        for item in items {
                            self.render_nodes(name, body, item, out)?;
                        }
                    }
                    Some(Value::Object(map)) => {
                        for item in map.values() {
                            self.render_nodes(name, body, item, out)?;
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(())
    }
}

fn parse(name: &str, source: &str) -> Result<Vec<Node>, RenderError> {
    let syntax = |reason: String| RenderError::Syntax {
        template: name.to_string(),
        reason,
    };

    // Each open `range` pushes a frame; `end` folds it into its parent.
    let mut stack: Vec<(Vec<String>, Vec<Node>)> = vec![(Vec::new(), Vec::new())];
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let (text, after) = rest.split_at(start);
        if !text.is_empty() {
            push(&mut stack, Node::Text(text.to_string()));
        }
        let after = &after[2..];
        let end = after
            .find("}}")
            .ok_or_else(|| syntax("unclosed action".to_string()))?;
        let inner = after[..end].trim();
        rest = &after[end + 2..];

        let words: Vec<&str> = inner.split_whitespace().collect();
        match words.as_slice() {
            ["end"] => {
                if stack.len() < 2 {
                    return Err(syntax("unexpected {{end}}".to_string()));
                }
                if let Some((path, body)) = stack.pop() {
                    push(&mut stack, Node::Range { path, body });
                }
            }
            ["range", path] => {
                let path = parse_path(path).ok_or_else(|| syntax(format!("bad range path '{path}'")))?;
                stack.push((path, Vec::new()));
            }
            [path] => {
                let path = parse_path(path).ok_or_else(|| syntax(format!("bad field reference '{path}'")))?;
                push(&mut stack, Node::Action(Action { func: None, path }));
            }
            [func, path] => {
                let path = parse_path(path).ok_or_else(|| syntax(format!("bad argument '{path}'")))?;
                push(
                    &mut stack,
                    Node::Action(Action {
                        func: Some(func.to_string()),
                        path,
                    }),
                );
            }
            _ => return Err(syntax(format!("unsupported action '{inner}'"))),
        }
    }

    if !rest.is_empty() {
        push(&mut stack, Node::Text(rest.to_string()));
    }
    if stack.len() != 1 {
        return Err(syntax("missing {{end}}".to_string()));
    }
    Ok(stack.pop().map(|(_, nodes)| nodes).unwrap_or_default())
}

fn push(stack: &mut [(Vec<String>, Vec<Node>)], node: Node) {
    if let Some((_, nodes)) = stack.last_mut() {
        nodes.push(node);
    }
}

fn parse_path(token: &str) -> Option<Vec<String>> {
    if token == "." {
        return Some(Vec::new());
    }
    let rest = token.strip_prefix('.')?;
    let parts: Vec<String> = rest.split('.').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return None;
    }
    Some(parts)
}

fn lookup<'v>(data: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(data, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

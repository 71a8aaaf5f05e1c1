//! Source and target dialect tables.
//!
//! The analyzer is parameterized by a [`Dialect`] so the same recognizer runs
//! over React input and over generated Solid output.

/// A component dialect the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// React function and class components.
    React,
    /// SolidJS components.
    Solid,
}

impl Dialect {
    /// Primitives declaring a `[value, setter]` pair.
    pub fn state_primitives(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &["useState", "useReducer"],
            Dialect::Solid => &["createSignal", "createReducer"],
        }
    }

    /// Primitives whose second element is a dispatch function.
    pub fn reducer_primitives(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &["useReducer"],
            Dialect::Solid => &["createReducer"],
        }
    }

    /// Primitives that run a callback in response to changes.
    pub fn effect_primitives(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &["useEffect", "useLayoutEffect"],
            Dialect::Solid => &["createEffect", "createRenderEffect", "onMount"],
        }
    }

    /// Effect primitives that run once on mount.
    pub fn mount_primitives(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &[],
            Dialect::Solid => &["onMount"],
        }
    }

    /// Primitive registering cleanup inside an effect, if the dialect has one.
    pub fn cleanup_primitive(&self) -> Option<&'static str> {
        match self {
            Dialect::React => None,
            Dialect::Solid => Some("onCleanup"),
        }
    }

    /// Memoized callback wrapper, unwrapped when resolving handlers.
    pub fn callback_wrappers(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &["useCallback"],
            Dialect::Solid => &[],
        }
    }

    /// Modules providing the framework itself.
    pub fn framework_modules(&self) -> &'static [&'static str] {
        match self {
            Dialect::React => &["react", "react-dom", "react-dom/client"],
            Dialect::Solid => &["solid-js", "solid-js/web", "@solid-primitives/reducer"],
        }
    }

    /// Normalize a dotted callee (`React.useState` -> `useState`).
    pub fn normalize_callee<'a>(&self, callee: &'a str) -> &'a str {
        match self {
            Dialect::React => callee.strip_prefix("React.").unwrap_or(callee),
            Dialect::Solid => callee,
        }
    }

    /// Whether a callee declares state.
    pub fn is_state_call(&self, callee: &str) -> bool {
        self.state_primitives()
            .contains(&self.normalize_callee(callee))
    }

    /// Whether a callee declares an effect.
    pub fn is_effect_call(&self, callee: &str) -> bool {
        self.effect_primitives()
            .contains(&self.normalize_callee(callee))
    }
}

/// Bare networking functions.
pub const NETWORK_FUNCTIONS: &[&str] = &["fetch", "axios", "ky"];

/// HTTP verbs exposed as methods by request clients.
pub const HTTP_VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "request"];

/// Whether a dotted callee is a networking primitive. Returns the HTTP method.
pub fn network_method(callee: &str) -> Option<&'static str> {
    if NETWORK_FUNCTIONS.contains(&callee) {
        return Some("GET");
    }
    let (client, verb) = callee.split_once('.')?;
    if !NETWORK_FUNCTIONS.contains(&client) {
        return None;
    }
    match verb {
        "get" => Some("GET"),
        "post" => Some("POST"),
        "put" => Some("PUT"),
        "patch" => Some("PATCH"),
        "delete" => Some("DELETE"),
        "head" => Some("HEAD"),
        "request" => Some("REQUEST"),
        _ => None,
    }
}

/// Name prefixes of imported loaders treated as external calls by the fallback.
pub const LOADER_PREFIXES: &[&str] = &["fetch", "load", "get", "post", "save"];

/// Confidence of the handler naming fallback.
pub const HANDLER_HEURISTIC_CONFIDENCE: f32 = 0.5;

/// Confidence of the loader naming fallback.
pub const LOADER_HEURISTIC_CONFIDENCE: f32 = 0.6;

// =============================================================================
// React -> Solid rule tables
// =============================================================================

/// JSX attribute renames.
pub const ATTRIBUTE_RENAMES: &[(&str, &str)] = &[
    ("className", "class"),
    ("htmlFor", "for"),
    ("defaultValue", "value"),
    ("defaultChecked", "checked"),
];

/// Rename of a JSX attribute, if any.
pub fn rename_attribute(name: &str) -> Option<&'static str> {
    ATTRIBUTE_RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
}

/// Type renames, keyed by the React name with or without the `React.` prefix.
pub const TYPE_RENAMES: &[(&str, &str)] = &[
    ("ReactNode", "JSX.Element"),
    ("ReactElement", "JSX.Element"),
    ("JSX.Element", "JSX.Element"),
    ("FC", "Component"),
    ("FunctionComponent", "Component"),
    ("CSSProperties", "JSX.CSSProperties"),
    ("ChangeEvent", "Event"),
    ("FormEvent", "SubmitEvent"),
    ("MouseEvent", "MouseEvent"),
    ("KeyboardEvent", "KeyboardEvent"),
    ("FocusEvent", "FocusEvent"),
    ("SyntheticEvent", "Event"),
];

/// Event types whose type arguments are dropped after renaming.
pub const EVENT_TYPES: &[&str] = &[
    "ChangeEvent",
    "FormEvent",
    "MouseEvent",
    "KeyboardEvent",
    "FocusEvent",
    "SyntheticEvent",
];

/// Look up a React type rename.
pub fn rename_type(name: &str) -> Option<&'static str> {
    let bare = name.strip_prefix("React.").unwrap_or(name);
    TYPE_RENAMES
        .iter()
        .find(|(from, _)| *from == bare)
        .map(|(_, to)| *to)
}

/// Solid rendering of a React event type with an optional element argument.
pub fn event_type(react_name: &str, element: Option<&str>) -> String {
    let bare = react_name.strip_prefix("React.").unwrap_or(react_name);
    let renamed = rename_type(bare).unwrap_or("Event");
    match element {
        Some(el) if bare == "ChangeEvent" => {
            format!("{renamed} & {{ currentTarget: {el}; target: {el} }}")
        }
        Some(el) => format!("{renamed} & {{ currentTarget: {el} }}"),
        None => renamed.to_string(),
    }
}

/// Names only React exports, renamed even without the `React.` prefix.
pub const REACT_ONLY_TYPES: &[&str] = &[
    "ReactNode",
    "ReactElement",
    "FC",
    "FunctionComponent",
    "CSSProperties",
    "ChangeEvent",
    "FormEvent",
    "SyntheticEvent",
];

/// Rewrite React type names inside a type expression written as text.
pub fn map_type_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !(c.is_ascii_alphabetic() || c == '_' || c == '$') {
            out.push(c);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '$' | '.')) {
            i += 1;
        }
        let token: String = chars[start..i].iter().collect();
        let bare = token.strip_prefix("React.");
        let is_react = bare.is_some() || REACT_ONLY_TYPES.contains(&token.as_str());
        let bare = bare.unwrap_or(&token);
        if !is_react {
            out.push_str(&token);
            continue;
        }
        if EVENT_TYPES.contains(&bare) {
            let mut element = None;
            if chars.get(i) == Some(&'<') {
                if let Some(close) = matching_angle(&chars, i) {
                    element = Some(chars[i + 1..close].iter().collect::<String>());
                    i = close + 1;
                }
            }
            out.push_str(&event_type(bare, element.as_deref().map(str::trim)));
        } else {
            out.push_str(rename_type(bare).unwrap_or(bare));
        }
    }
    out
}

fn matching_angle(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in chars[open..].iter().enumerate() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// React hooks that must not survive in generated output.
pub const REACT_ONLY_HOOKS: &[&str] = &[
    "useState",
    "useReducer",
    "useEffect",
    "useLayoutEffect",
    "useMemo",
    "useCallback",
    "useRef",
];

/// Class lifecycle methods the transformer cannot express.
pub const UNSUPPORTED_LIFECYCLE: &[&str] = &[
    "getDerivedStateFromProps",
    "getSnapshotBeforeUpdate",
    "componentDidCatch",
    "getDerivedStateFromError",
    "componentWillReceiveProps",
    "UNSAFE_componentWillReceiveProps",
    "componentWillUpdate",
    "UNSAFE_componentWillUpdate",
];

/// Class lifecycle methods run once before the first render.
pub const WILL_MOUNT: &[&str] = &["componentWillMount", "UNSAFE_componentWillMount"];

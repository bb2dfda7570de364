// src/config.rs
//! Compile options and environment knobs.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::codegen::profile::{Glsl100, Glsl300, Profile};

/// Target shading-language revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GLSL ES 1.00 (`attribute`/`varying`, `gl_FragColor`).
    Glsl100,
    /// GLSL ES 3.00 (`in`/`out`, explicit output locations).
    #[default]
    Glsl300,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Glsl100, Backend::Glsl300];

    pub fn profile(self) -> &'static dyn Profile {
        match self {
            Backend::Glsl100 => &Glsl100,
            Backend::Glsl300 => &Glsl300,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Glsl100 => "glsl100",
            Backend::Glsl300 => "glsl300",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glsl100" | "gles2" | "100" => Ok(Backend::Glsl100),
            "glsl300" | "gles3" | "300" | "300es" => Ok(Backend::Glsl300),
            other => Err(format!("unknown backend '{other}' (expected glsl100 or glsl300)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub backend: Backend,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            vertex_entry: "vert".into(),
            fragment_entry: "frag".into(),
        }
    }
}

impl CompileOptions {
    pub fn new(backend: Backend, vertex_entry: &str, fragment_entry: &str) -> Self {
        Self {
            backend,
            vertex_entry: vertex_entry.into(),
            fragment_entry: fragment_entry.into(),
        }
    }

    /// Defaults overridden by `SHADERLAB_BACKEND`, `SHADERLAB_VERTEX_ENTRY` and
    /// `SHADERLAB_FRAGMENT_ENTRY`. An unparsable backend is logged and ignored.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Ok(v) = std::env::var("SHADERLAB_BACKEND") {
            match v.parse() {
                Ok(b) => opts.backend = b,
                Err(e) => log::warn!("[config] SHADERLAB_BACKEND: {e}"),
            }
        }
        if let Ok(v) = std::env::var("SHADERLAB_VERTEX_ENTRY") {
            opts.vertex_entry = v;
        }
        if let Ok(v) = std::env::var("SHADERLAB_FRAGMENT_ENTRY") {
            opts.fragment_entry = v;
        }
        opts
    }
}

/// Positive integer from the environment, or `default` when unset or invalid.
pub fn env_usize(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Treat any value other than "0"/"false" (case-insensitive) as true.
pub fn env_flag_true(var: &str, default: bool) -> bool {
    std::env::var(var)
        .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Backend::Glsl100).unwrap();
        assert_eq!(json, "\"glsl100\"");
        let opts: CompileOptions =
            serde_json::from_str(r#"{"backend":"glsl100","vertex_entry":"v"}"#).unwrap();
        assert_eq!(opts.backend, Backend::Glsl100);
        assert_eq!(opts.vertex_entry, "v");
        assert_eq!(opts.fragment_entry, "frag");
    }

    #[test]
    fn backend_from_str_accepts_aliases() {
        assert_eq!("GLES2".parse::<Backend>(), Ok(Backend::Glsl100));
        assert_eq!("300es".parse::<Backend>(), Ok(Backend::Glsl300));
        assert!("metal".parse::<Backend>().is_err());
    }

    #[test]
    fn unset_env_knobs_fall_back_to_defaults() {
        assert_eq!(env_usize("SHADERLAB_TEST_SURELY_UNSET_VAR", 7), 7);
        assert!(env_flag_true("SHADERLAB_TEST_SURELY_UNSET_VAR", true));
    }
}

// src/semantic/macros.rs
// Conditional-compilation tracking and `#define` parsing.

/// One open conditional: the directive lines seen so far (`#if A`, then `#else`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFrame {
    /// Unique per opened conditional within one compilation.
    pub id: usize,
    pub lines: Vec<String>,
}

impl BranchFrame {
    /// Wraps `body` in this frame's directives plus the closing `#endif`.
    pub fn wrap(frames: &[BranchFrame], body: &str) -> String {
        let mut out = String::new();
        for f in frames {
            for line in &f.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(body);
        for _ in frames {
            out.push_str("\n#endif");
        }
        out
    }
}

#[derive(Debug, Default, Clone)]
pub struct MacroTracker {
    level: usize,
    frames: Vec<BranchFrame>,
    next_id: usize,
}

impl MacroTracker {
    pub fn level(&self) -> usize {
        self.level
    }

    /// True while any conditional branch is open.
    pub fn in_branch(&self) -> bool {
        self.level > 0
    }

    /// Snapshot of the currently open frames, outermost first.
    pub fn frames(&self) -> &[BranchFrame] {
        &self.frames
    }

    /// `#if`, `#ifdef`, `#ifndef`
    pub fn open(&mut self, line: &str) {
        self.level += 1;
        self.frames.push(BranchFrame {
            id: self.next_id,
            lines: vec![line.to_string()],
        });
        self.next_id += 1;
    }

    /// `#else`, `#elif`: stays at the same level and extends the innermost frame.
    pub fn alternate(&mut self, line: &str) -> Result<(), String> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.lines.push(line.to_string());
                Ok(())
            }
            None => Err(format!("'{}' without matching #if", directive_name(line))),
        }
    }

    /// `#endif`
    pub fn close(&mut self) -> Result<(), String> {
        if self.frames.pop().is_none() {
            return Err("'#endif' without matching #if".into());
        }
        self.level -= 1;
        Ok(())
    }

    /// Frames in `member` that were opened after the frames in `outer`.
    pub fn trim_outer(member: &[BranchFrame], outer: &[BranchFrame]) -> Vec<BranchFrame> {
        member
            .iter()
            .filter(|f| !outer.iter().any(|o| o.id == f.id))
            .cloned()
            .collect()
    }
}

fn directive_name(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or(line)
}

/// Parsed `#define NAME(params) body` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    /// `Some` for function-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
}

pub fn parse_define(line: &str) -> Option<MacroDefinition> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("define")?;
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let name = rest[..name_len].to_string();
    let after = &rest[name_len..];

    // A parenthesis directly after the name makes the macro function-like.
    if let Some(args) = after.strip_prefix('(') {
        let close = args.find(')')?;
        let params = args[..close]
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        return Some(MacroDefinition {
            name,
            params: Some(params),
            body: args[close + 1..].trim().replace("\\\n", " "),
        });
    }
    Some(MacroDefinition {
        name,
        params: None,
        body: after.trim().replace("\\\n", " "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn else_keeps_level_and_endif_closes() {
        let mut m = MacroTracker::default();
        m.open("#ifdef A");
        m.open("#if B > 1");
        assert_eq!(m.level(), 2);
        m.alternate("#else").unwrap();
        assert_eq!(m.level(), 2);
        assert_eq!(m.frames()[1].lines, vec!["#if B > 1", "#else"]);
        m.close().unwrap();
        m.close().unwrap();
        assert!(!m.in_branch());
        assert!(m.close().is_err());
        assert!(m.alternate("#elif C").unwrap_err().contains("#elif"));
    }

    #[test]
    fn trimming_drops_frames_open_before_the_struct() {
        let mut m = MacroTracker::default();
        m.open("#ifdef OUTER");
        let outer = m.frames().to_vec();
        m.open("#ifdef INNER");
        let member = m.frames().to_vec();
        let trimmed = MacroTracker::trim_outer(&member, &outer);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].lines, vec!["#ifdef INNER"]);
        assert_eq!(
            BranchFrame::wrap(&trimmed, "varying vec2 uv;"),
            "#ifdef INNER\nvarying vec2 uv;\n#endif"
        );
    }

    #[test]
    fn define_forms() {
        let d = parse_define("#define PI 3.14159").unwrap();
        assert_eq!(d.name, "PI");
        assert_eq!(d.params, None);
        assert_eq!(d.body, "3.14159");

        let d = parse_define("#  define SQR(x, y) ((x)*(y))").unwrap();
        assert_eq!(d.name, "SQR");
        assert_eq!(d.params, Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(d.body, "((x)*(y))");

        let d = parse_define("#define USE_FOG").unwrap();
        assert_eq!(d.body, "");
        assert!(parse_define("#define").is_none());
    }
}

//! IR → backend shading-language text.
//!
//! The generator knows nothing about backend identity. Everything backend-specific arrives
//! through [`BackendOptions`]: declaration syntax, the swizzle alphabet, and how a
//! `texture(channel, uv)` call binds to a concrete sampler.

use super::ir::{ShaderBuilder, ShaderOp, ShaderType, MAX_CHANNELS};

const INDENT: &str = "    ";

/// Formats a declaration: `(name, type, is_uniform) -> line`.
pub type DeclareVar = fn(&str, ShaderType, bool) -> String;

/// Formats a sampling call for channel `n` with the (already rewritten) argument text.
pub type SampleCall = fn(usize, &str) -> String;

/// Logical component letter (`r`, `g`, `b`, `a`) → backend swizzle letter.
///
/// Letters without an entry pass through unchanged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ComponentMap {
    entries: [Option<char>; 4],
}

impl ComponentMap {
    /// No remapping at all.
    pub const fn empty() -> Self {
        Self { entries: [None; 4] }
    }

    /// `r→r, g→g, b→b, a→a`.
    pub const fn identity() -> Self {
        Self {
            entries: [Some('r'), Some('g'), Some('b'), Some('a')],
        }
    }

    /// `r→x, g→y, b→z, a→w`.
    pub const fn xyzw() -> Self {
        Self {
            entries: [Some('x'), Some('y'), Some('z'), Some('w')],
        }
    }

    pub const fn with(mut self, from: char, to: char) -> Self {
        if let Some(slot) = slot_of(from) {
            self.entries[slot] = Some(to);
        }
        self
    }

    #[inline]
    pub fn map(&self, c: char) -> char {
        slot_of(c).and_then(|i| self.entries[i]).unwrap_or(c)
    }
}

const fn slot_of(c: char) -> Option<usize> {
    match c {
        'r' => Some(0),
        'g' => Some(1),
        'b' => Some(2),
        'a' => Some(3),
        _ => None,
    }
}

/// How `texture(channel, uv)` reaches a sampler.
#[derive(Debug, Copy, Clone)]
pub enum SamplerBinding {
    /// One named sampler per channel; calls are rewritten through the formatter.
    Numbered(SampleCall),
    /// The prelude resolves `texture(channel, uv)` itself; calls pass through untouched.
    Unified,
}

/// The only backend knowledge the generator consumes.
#[derive(Debug, Copy, Clone)]
pub struct BackendOptions {
    pub component_map: ComponentMap,
    pub declare_var: DeclareVar,
    pub sampler: SamplerBinding,
}

/// Generator output: statement lines for the program body and member lines for the uniform
/// block, both in IR order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedShader {
    pub body_lines: Vec<String>,
    pub uniform_lines: Vec<String>,
}

/// Compiles `builder` for one backend.
///
/// Deterministic: the same builder and options always produce byte-identical text.
/// Conditional blocks are emitted as given; unbalanced sequences produce unbalanced braces.
pub fn generate(builder: &ShaderBuilder, options: &BackendOptions) -> GeneratedShader {
    let mut body_lines = Vec::with_capacity(builder.ops().len());
    let mut depth = 0usize;

    for op in builder.ops() {
        match op {
            ShaderOp::Declare { name, ty } => {
                body_lines.push(indented(depth, (options.declare_var)(name, *ty, false)));
            }
            ShaderOp::Assign { op, target, expr } => {
                let expr = rewrite_expression(expr, options);
                body_lines.push(indented(depth, format!("{target} {} {expr};", op.symbol())));
            }
            ShaderOp::If(cond) => {
                let cond = rewrite_expression(cond, options);
                body_lines.push(indented(depth, format!("if ({cond}) {{")));
                depth += 1;
            }
            ShaderOp::ElseIf(cond) => {
                let cond = rewrite_expression(cond, options);
                depth = depth.saturating_sub(1);
                body_lines.push(indented(depth, format!("}} else if ({cond}) {{")));
                depth += 1;
            }
            ShaderOp::Else => {
                depth = depth.saturating_sub(1);
                body_lines.push(indented(depth, "} else {".to_string()));
                depth += 1;
            }
            ShaderOp::EndIf => {
                depth = depth.saturating_sub(1);
                body_lines.push(indented(depth, "}".to_string()));
            }
        }
    }

    // Table order is offset order; the backend struct layout depends on it.
    let uniform_lines = builder
        .uniforms()
        .iter()
        .map(|u| (options.declare_var)(&u.name, u.ty, true))
        .collect();

    GeneratedShader { body_lines, uniform_lines }
}

fn indented(depth: usize, line: String) -> String {
    if depth == 0 { line } else { format!("{}{line}", INDENT.repeat(depth)) }
}

/// Runs both text passes: sampler binding, then component remap.
pub fn rewrite_expression(expr: &str, options: &BackendOptions) -> String {
    let sampled = match options.sampler {
        SamplerBinding::Numbered(call) => rewrite_texture_calls(expr, call),
        SamplerBinding::Unified => expr.to_string(),
    };
    remap_components(&sampled, &options.component_map)
}

/// Rewrites `texture(<n>, args)` into `call(n, args)` for `n < MAX_CHANNELS`.
///
/// Arguments are rewritten recursively so nested samples bind too. Calls whose first
/// argument is not a literal channel index are left alone.
pub fn rewrite_texture_calls(expr: &str, call: SampleCall) -> String {
    const KEY: &str = "texture(";

    let mut out = String::with_capacity(expr.len() + 16);
    let mut i = 0;

    while i < expr.len() {
        let rest = &expr[i..];
        let at_boundary = expr[..i].chars().next_back().is_none_or(|c| !is_ident_char(c));

        if at_boundary && rest.starts_with(KEY) {
            if let Some((channel, args, consumed)) = parse_texture_call(&rest[KEY.len()..]) {
                out.push_str(&call(channel, &rewrite_texture_calls(args, call)));
                i += KEY.len() + consumed;
                continue;
            }
        }

        // Safe: `i` always sits on a char boundary.
        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        i += c.len_utf8();
    }

    out
}

/// Parses `<digits> , <args> )` after `texture(`.
///
/// Returns the channel, the trimmed argument text and the number of bytes consumed
/// (including the closing parenthesis).
fn parse_texture_call(s: &str) -> Option<(usize, &str, usize)> {
    let trimmed = s.trim_start();
    let lead = s.len() - trimmed.len();

    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let channel: usize = trimmed[..digits].parse().ok()?;
    if channel >= MAX_CHANNELS {
        return None;
    }

    let after_digits = &trimmed[digits..];
    let comma_rel = after_digits.len() - after_digits.trim_start().len();
    if !after_digits[comma_rel..].starts_with(',') {
        return None;
    }
    let args_start = lead + digits + comma_rel + 1;

    let mut depth = 1usize;
    for (j, c) in s[args_start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let args = s[args_start..args_start + j].trim();
                    return Some((channel, args, args_start + j + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Remaps `.` + 1–4 letters from `{r,g,b,a}` letter by letter.
///
/// The letters must form the whole member name, so `.resolution` or `.rgb2` are untouched.
pub fn remap_components(expr: &str, map: &ComponentMap) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        out.push(c);
        if c != '.' {
            continue;
        }

        let tail = &expr[i + 1..];
        let run = tail.find(|ch: char| !is_ident_char(ch)).unwrap_or(tail.len());
        let member = &tail[..run];

        if (1..=4).contains(&member.len()) && member.chars().all(|ch| slot_of(ch).is_some()) {
            out.extend(member.chars().map(|ch| map.map(ch)));
            for _ in 0..member.len() {
                chars.next();
            }
        }
    }

    out
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

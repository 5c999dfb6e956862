//! RFC 2849 LDIF parsing/rendering and change-record reversal.

use crate::dn::Dn;
use crate::error::LdifError;
use std::collections::BTreeMap;

/// A single `attr: value` pair as it appears on an entry or in a modify
/// record's pre/post image.
pub type Attrs = BTreeMap<String, Vec<Vec<u8>>>;

/// One primitive modify operation, RFC 4511 `Modification`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mod {
    Add(String, Vec<Vec<u8>>),
    Delete(String, Vec<Vec<u8>>),
    Replace(String, Vec<Vec<u8>>),
}

/// A parsed LDIF change record (RFC 2849 §4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChangeRecord {
    Add { dn: Dn, attrs: Attrs },
    Delete { dn: Dn },
    Modify { dn: Dn, mods: Vec<Mod> },
    ModifyDn {
        dn: Dn,
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<Dn>,
    },
}

impl ChangeRecord {
    pub fn dn(&self) -> &Dn {
        match self {
            ChangeRecord::Add { dn, .. }
            | ChangeRecord::Delete { dn }
            | ChangeRecord::Modify { dn, .. }
            | ChangeRecord::ModifyDn { dn, .. } => dn,
        }
    }
}

/// Computes the reverse of a change record against the pre-image of the
/// affected entry, per the rules in the change-reversal contract: `Add`
/// reverses to `Delete` (and vice versa using the entry's pre-image
/// attributes), `Modify` reverses per-primitive-op against `pre_image`, and
/// `ModifyDn` reverses by swapping old/new RDN and superior, recomputing
/// `delete_old_rdn` against whether the original RDN value survived.
pub fn reverse(record: &ChangeRecord, pre_image: &Attrs) -> Result<ChangeRecord, LdifError> {
    match record {
        ChangeRecord::Add { dn, .. } => Ok(ChangeRecord::Delete { dn: dn.clone() }),
        ChangeRecord::Delete { dn } => Ok(ChangeRecord::Add {
            dn: dn.clone(),
            attrs: pre_image.clone(),
        }),
        ChangeRecord::Modify { dn, mods } => {
            // Each primitive op's inverse is computed against the single
            // snapshot pre-image of the whole request, not a running state
            // threaded through the array — an attribute touched by several
            // ops in one Modify always reverses relative to how it looked
            // before *any* of them ran.
            let mut inverse = mods
                .iter()
                .map(|m| reverse_one(m, pre_image))
                .collect::<Result<Vec<_>, _>>()?;
            inverse.reverse();
            Ok(ChangeRecord::Modify {
                dn: dn.clone(),
                mods: inverse,
            })
        }
        ChangeRecord::ModifyDn {
            dn,
            new_rdn,
            delete_old_rdn: _,
            new_superior,
        } => {
            let old_rdn = dn.rdn().map(|r| r.to_string()).unwrap_or_default();
            // The reverse deletes the *new* RDN's value iff it was not among
            // the pre-image's values for that attribute (i.e. it was freshly
            // introduced by the forward rename and has no other reason to
            // remain on the entry).
            let new_rdn_attr_lower = new_rdn
                .split('=')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            let new_rdn_value = new_rdn.splitn(2, '=').nth(1).unwrap_or_default();
            let reverse_delete_old_rdn = !pre_image
                .get(&new_rdn_attr_lower)
                .map(|vals| vals.iter().any(|v| v == new_rdn_value.as_bytes()))
                .unwrap_or(false);
            let new_leaf = crate::dn::parse(new_rdn)
                .ok()
                .and_then(|d| d.rdn().cloned())
                .unwrap_or_else(|| dn.rdn().cloned().expect("rename of root DN is impossible"));
            // Forward's resulting DN: the new leaf under whichever superior
            // the forward operation actually placed it — `new_superior` if
            // given, else the entry's unchanged parent.
            let forward_parent = new_superior.clone().unwrap_or_else(|| dn.parent().unwrap_or_else(Dn::root));
            let new_dn = forward_parent.child(new_leaf);
            Ok(ChangeRecord::ModifyDn {
                dn: new_dn,
                new_rdn: old_rdn,
                delete_old_rdn: reverse_delete_old_rdn,
                new_superior: new_superior.as_ref().map(|_| dn.parent().unwrap_or_else(Dn::root)),
            })
        }
    }
}

fn reverse_one(m: &Mod, pre: &Attrs) -> Result<Mod, LdifError> {
    match m {
        Mod::Add(attr, values) => Ok(Mod::Delete(attr.clone(), values.clone())),
        Mod::Delete(attr, values) if values.is_empty() => {
            let full = pre
                .get(&attr.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| LdifError::MissingPreImage(attr.clone()))?;
            Ok(Mod::Add(attr.clone(), full))
        }
        Mod::Delete(attr, values) => Ok(Mod::Add(attr.clone(), values.clone())),
        Mod::Replace(attr, _new) => match pre.get(&attr.to_ascii_lowercase()) {
            Some(old) if !old.is_empty() => Ok(Mod::Replace(attr.clone(), old.clone())),
            _ => Ok(Mod::Delete(attr.clone(), Vec::new())),
        },
    }
}

/// Parses a buffer of LDIF change records (RFC 2849 §4). Attribute
/// continuation lines (a leading space) are unfolded before parsing; `attr::`
/// lines are base64-decoded; `attr:<` URL references are rejected as
/// unsupported in this context since change records must be self-contained.
pub fn parse_ldif(bytes: &[u8]) -> Result<Vec<ChangeRecord>, LdifError> {
    let text = String::from_utf8_lossy(bytes);
    let unfolded = unfold(&text);
    let mut records = Vec::new();
    for (line_no, block) in split_blocks(&unfolded) {
        if block.trim().is_empty() {
            continue;
        }
        if block.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with("version:") || l.starts_with('#')
        }) {
            continue;
        }
        records.push(parse_block(line_no, &block)?);
    }
    Ok(records)
}

fn unfold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        if let Some(rest) = line.strip_prefix(' ') {
            out.push_str(rest.trim_end_matches('\r'));
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line.trim_end_matches('\r'));
        }
    }
    out
}

fn split_blocks(text: &str) -> Vec<(usize, String)> {
    let mut blocks = Vec::new();
    let mut line_no = 1;
    let mut cur_start_line = 1;
    let mut cur = String::new();
    for line in text.split('\n') {
        if line.is_empty() {
            if !cur.is_empty() {
                blocks.push((cur_start_line, std::mem::take(&mut cur)));
            }
            cur_start_line = line_no + 1;
        } else {
            if cur.is_empty() {
                cur_start_line = line_no;
            } else {
                cur.push('\n');
            }
            cur.push_str(line);
        }
        line_no += 1;
    }
    if !cur.is_empty() {
        blocks.push((cur_start_line, cur));
    }
    blocks
}

fn parse_block(line_no: usize, block: &str) -> Result<ChangeRecord, LdifError> {
    let mut dn: Option<Dn> = None;
    let mut changetype: Option<String> = None;
    let mut attrs: Attrs = BTreeMap::new();
    let mut mods: Vec<Mod> = Vec::new();
    let mut pending_mod: Option<(String, String, Vec<Vec<u8>>)> = None;
    let mut new_rdn: Option<String> = None;
    let mut delete_old_rdn = false;
    let mut new_superior: Option<Dn> = None;

    for line in block.lines() {
        if line.starts_with('#') {
            continue;
        }
        let (attr, value) = parse_attr_line(line_no, line)?;
        match attr.as_str() {
            "dn" => {
                dn = Some(Dn::parse(&String::from_utf8(value).map_err(|_| {
                    LdifError::Malformed {
                        line: line_no,
                        reason: "dn value is not valid UTF-8",
                    }
                })?).map_err(LdifError::Dn)?);
            }
            "changetype" => {
                changetype = Some(String::from_utf8_lossy(&value).into_owned());
            }
            "add" | "delete" | "replace" => {
                if let Some((op, a, vs)) = pending_mod.take() {
                    mods.push(finish_mod(&op, a, vs));
                }
                pending_mod = Some((attr, String::from_utf8_lossy(&value).trim().to_string(), Vec::new()));
            }
            "newrdn" => new_rdn = Some(String::from_utf8_lossy(&value).into_owned()),
            "deleteoldrdn" => delete_old_rdn = value == b"1",
            "newsuperior" => {
                new_superior = Some(
                    Dn::parse(&String::from_utf8_lossy(&value)).map_err(LdifError::Dn)?,
                );
            }
            "-" => {
                if let Some((op, a, vs)) = pending_mod.take() {
                    mods.push(finish_mod(&op, a, vs));
                }
            }
            _ => {
                if changetype.as_deref() == Some("modify") {
                    if let Some((_, _, vs)) = pending_mod.as_mut() {
                        vs.push(value);
                        continue;
                    }
                }
                attrs.entry(attr.to_ascii_lowercase()).or_default().push(value);
            }
        }
    }
    if let Some((op, a, vs)) = pending_mod.take() {
        mods.push(finish_mod(&op, a, vs));
    }

    let dn = dn.ok_or(LdifError::Malformed {
        line: line_no,
        reason: "record missing dn:",
    })?;

    match changetype.as_deref() {
        None | Some("add") => Ok(ChangeRecord::Add { dn, attrs }),
        Some("delete") => Ok(ChangeRecord::Delete { dn }),
        Some("modify") => Ok(ChangeRecord::Modify { dn, mods }),
        Some("modrdn") | Some("moddn") => Ok(ChangeRecord::ModifyDn {
            dn,
            new_rdn: new_rdn.ok_or(LdifError::Malformed {
                line: line_no,
                reason: "modrdn record missing newrdn:",
            })?,
            delete_old_rdn,
            new_superior,
        }),
        Some(other) => Err(LdifError::UnsupportedChangeType(other.to_string())),
    }
}

fn finish_mod(op: &str, attr: String, values: Vec<Vec<u8>>) -> Mod {
    match op {
        "add" => Mod::Add(attr, values),
        "delete" => Mod::Delete(attr, values),
        _ => Mod::Replace(attr, values),
    }
}

fn parse_attr_line(line_no: usize, line: &str) -> Result<(String, Vec<u8>), LdifError> {
    if let Some(idx) = line.find("::") {
        let attr = line[..idx].to_string();
        let b64 = line[idx + 2..].trim();
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64)
            .map_err(|_| LdifError::InvalidBase64 { line: line_no })?;
        return Ok((attr, decoded));
    }
    if let Some(idx) = line.find(':') {
        let attr = line[..idx].to_string();
        let rest = &line[idx + 1..];
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        return Ok((attr, value.as_bytes().to_vec()));
    }
    Err(LdifError::Malformed {
        line: line_no,
        reason: "expected 'attr:' or 'attr::'",
    })
}

/// Renders a single change record to LDIF bytes, folding lines at
/// `line_width` (0 disables folding) and base64-encoding any value that
/// fails the raw-string safety predicate.
pub fn render_ldif(record: &ChangeRecord, line_width: usize) -> Vec<u8> {
    let mut out = String::new();
    emit_line(&mut out, "dn", record.dn().render(crate::dn::Style::User).as_bytes(), line_width);
    match record {
        ChangeRecord::Add { attrs, .. } => {
            for (attr, values) in attrs {
                for v in values {
                    emit_line(&mut out, attr, v, line_width);
                }
            }
        }
        ChangeRecord::Delete { .. } => {
            emit_line(&mut out, "changetype", b"delete", line_width);
        }
        ChangeRecord::Modify { mods, .. } => {
            emit_line(&mut out, "changetype", b"modify", line_width);
            for m in mods {
                let (kw, attr, values): (&str, &str, &[Vec<u8>]) = match m {
                    Mod::Add(a, v) => ("add", a, v),
                    Mod::Delete(a, v) => ("delete", a, v),
                    Mod::Replace(a, v) => ("replace", a, v),
                };
                emit_line(&mut out, kw, attr.as_bytes(), line_width);
                for v in values {
                    emit_line(&mut out, attr, v, line_width);
                }
                out.push_str("-\n");
            }
        }
        ChangeRecord::ModifyDn {
            new_rdn,
            delete_old_rdn,
            new_superior,
            ..
        } => {
            emit_line(&mut out, "changetype", b"modrdn", line_width);
            emit_line(&mut out, "newrdn", new_rdn.as_bytes(), line_width);
            emit_line(
                &mut out,
                "deleteoldrdn",
                if *delete_old_rdn { b"1" } else { b"0" },
                line_width,
            );
            if let Some(sup) = new_superior {
                emit_line(&mut out, "newsuperior", sup.render(crate::dn::Style::User).as_bytes(), line_width);
            }
        }
    }
    out.push('\n');
    out.into_bytes()
}

/// RFC 2849 §7 safety predicate for emitting a value as a raw string.
pub fn is_safe_string(value: &[u8]) -> bool {
    if value.is_empty() {
        return false;
    }
    match value[0] {
        0 | b'\n' | b'\r' | b' ' | b':' | b'<' => return false,
        _ => {}
    }
    if value.iter().any(|&b| b == 0 || b == b'\n' || b == b'\r') {
        return false;
    }
    if value.last() == Some(&b' ') {
        return false;
    }
    std::str::from_utf8(value).is_ok()
}

fn emit_line(out: &mut String, attr: &str, value: &[u8], line_width: usize) {
    let line = if is_safe_string(value) {
        format!("{}: {}", attr, std::str::from_utf8(value).unwrap())
    } else {
        let b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, value);
        format!("{}:: {}", attr, b64)
    };
    out.push_str(&fold(&line, line_width));
    out.push('\n');
}

fn fold(line: &str, line_width: usize) -> String {
    if line_width == 0 || line.len() <= line_width {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / line_width);
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut first = true;
    while i < bytes.len() {
        let budget = if first { line_width } else { line_width - 1 };
        let mut end = (i + budget).min(bytes.len());
        while end > i && !line.is_char_boundary(end) {
            end -= 1;
        }
        if !first {
            out.push('\n');
            out.push(' ');
        }
        out.push_str(&line[i..end]);
        i = end;
        first = false;
    }
    out
}

//! Name-usage introspection over a code object.
//!
//! The interesting part is global-name discovery: an access to a nested
//! name such as `math.sqrt` appears as `LOAD_GLOBAL math` followed by
//! `LOAD_ATTR sqrt`, and counts as the single dotted name `math.sqrt`.

use crate::code::CodeObject;
use crate::error::ReadError;
use crate::opcode::Opcode;
use crate::reader::read;

/// Dotted global names referenced by the code object, in first-use
/// order, deduplicated.
pub fn global_names(code: &CodeObject) -> Result<Vec<String>, ReadError> {
    let mut chains: Vec<Vec<String>> = Vec::new();
    let mut previous: Option<Opcode> = None;

    for instruction in read(code)? {
        match instruction.opcode {
            Opcode::LoadGlobal => {
                if let Some(name) = instruction.name() {
                    chains.push(vec![name.to_owned()]);
                }
            }
            Opcode::LoadAttr
                if matches!(previous, Some(Opcode::LoadGlobal | Opcode::LoadAttr)) =>
            {
                if let (Some(name), Some(chain)) = (instruction.name(), chains.last_mut()) {
                    chain.push(name.to_owned());
                }
            }
            _ => {}
        }
        previous = Some(instruction.opcode);
    }

    let mut names: Vec<String> = Vec::new();
    for chain in chains {
        let name = chain.join(".");
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

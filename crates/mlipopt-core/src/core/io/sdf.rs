use super::Format;
use super::error::Error;
use super::traits::MolecularFile;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{BufRead, Write};

const V2000_MAX_ENTRIES: usize = 999;
const PROGRAM_LINE: &str = "  mlipopt";

/// MDL SD files (V2000 connection tables), one record per structure.
///
/// Data items (`> <key>` blocks) map to `Molecule::properties`; multi-line values are
/// joined with newlines.
pub struct SdfFile;

fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn split_records(reader: &mut impl BufRead) -> Result<Vec<Vec<(usize, String)>>, Error> {
    let mut records = Vec::new();
    let mut current = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let content = line?;
        if content.trim_end() == "$$$$" {
            records.push(std::mem::take(&mut current));
            continue;
        }
        current.push((i + 1, content));
    }
    if current.iter().any(|(_, l)| !l.trim().is_empty()) {
        records.push(current);
    }
    Ok(records
        .into_iter()
        .filter(|r| r.iter().any(|(_, l)| !l.trim().is_empty()))
        .collect())
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    if line.contains("V3000") {
        return Err(Error::parse(Format::Sdf, line_no, "V3000 is not supported"));
    }
    let atoms = field(line, 0, 3)
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid atom count"))?;
    let bonds = field(line, 3, 6)
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_record(lines: &[(usize, String)]) -> Result<Molecule, Error> {
    let first_line = lines.first().map(|(ln, _)| *ln).unwrap_or(1);
    if lines.len() < 4 {
        return Err(Error::parse(
            Format::Sdf,
            first_line,
            "record must contain a header block and a counts line",
        ));
    }

    let (counts_line_no, counts_line) = &lines[3];
    let (atom_count, bond_count) = parse_counts(counts_line, *counts_line_no)?;
    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let block_end = bond_start + bond_count;
    if lines.len() < block_end {
        return Err(Error::parse(
            Format::Sdf,
            lines.last().map(|(ln, _)| *ln).unwrap_or(*counts_line_no),
            "record ended before atoms/bonds were fully specified",
        ));
    }

    let mut molecule = Molecule::new(lines[0].1.trim());

    for (ln, raw) in &lines[atom_start..bond_start] {
        let padded = format!("{raw:<40}");
        let coord = |start: usize, axis: char| {
            field(&padded, start, start + 10).parse::<f64>().map_err(|_| {
                Error::parse(
                    Format::Sdf,
                    *ln,
                    format!("invalid {} coordinate in atom line", axis),
                )
            })
        };
        let position = Point3::new(coord(0, 'x')?, coord(10, 'y')?, coord(20, 'z')?);
        let symbol = field(&padded, 31, 34);
        let element = Element::from_symbol(symbol).ok_or_else(|| {
            Error::parse(
                Format::Sdf,
                *ln,
                format!("unknown element symbol '{}'", symbol),
            )
        })?;
        molecule.add_atom(element, position);
    }

    for (ln, raw) in &lines[bond_start..block_end] {
        let index = |start: usize, what: &str| {
            field(raw, start, start + 3)
                .parse::<usize>()
                .map_err(|_| Error::parse(Format::Sdf, *ln, format!("invalid {}", what)))
        };
        let a1 = index(0, "first atom index")?;
        let a2 = index(3, "second atom index")?;
        let code = field(raw, 6, 9)
            .parse::<u8>()
            .map_err(|_| Error::parse(Format::Sdf, *ln, "invalid bond order value"))?;
        let order = BondOrder::from_ctfile(code)
            .ok_or_else(|| Error::parse(Format::Sdf, *ln, "unsupported bond order"))?;
        if a1 == 0 || a2 == 0 {
            return Err(Error::parse(
                Format::Sdf,
                *ln,
                "bond references atom outside declared range",
            ));
        }
        molecule
            .add_bond(a1 - 1, a2 - 1, order)
            .map_err(|e| Error::parse(Format::Sdf, *ln, e.to_string()))?;
    }

    let mut rest = lines[block_end..].iter().skip_while(|(_, l)| !l.starts_with("M  END"));
    rest.next();
    let mut pending_key: Option<String> = None;
    let mut value_lines: Vec<&str> = Vec::new();
    for (_, line) in rest {
        if let Some(key) = &pending_key {
            if line.trim().is_empty() {
                molecule
                    .properties
                    .insert(key.clone(), value_lines.join("\n"));
                pending_key = None;
                value_lines.clear();
            } else {
                value_lines.push(line.as_str());
            }
            continue;
        }
        if line.starts_with('>') {
            if let (Some(open), Some(close)) = (line.find('<'), line.rfind('>')) {
                if close > open {
                    pending_key = Some(line[open + 1..close].to_string());
                }
            }
        }
    }
    if let Some(key) = pending_key {
        molecule.properties.insert(key, value_lines.join("\n"));
    }

    Ok(molecule)
}

impl MolecularFile for SdfFile {
    type Error = Error;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error> {
        let records = split_records(reader)?;
        if records.is_empty() {
            return Err(Error::Empty(Format::Sdf));
        }
        records.iter().map(|r| parse_record(r)).collect()
    }

    fn write_to(molecules: &[Molecule], writer: &mut impl Write) -> Result<(), Self::Error> {
        for molecule in molecules {
            if molecule.len() > V2000_MAX_ENTRIES || molecule.bonds().len() > V2000_MAX_ENTRIES {
                return Err(Error::Unwritable {
                    format: Format::Sdf,
                    details: format!(
                        "V2000 records hold at most {} atoms and bonds",
                        V2000_MAX_ENTRIES
                    ),
                });
            }

            writeln!(writer, "{}", molecule.title.replace(['\n', '\r'], " "))?;
            writeln!(writer, "{}", PROGRAM_LINE)?;
            writeln!(writer)?;
            writeln!(
                writer,
                "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
                molecule.len(),
                molecule.bonds().len()
            )?;
            for atom in molecule.atoms() {
                writeln!(
                    writer,
                    "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                    atom.position.x,
                    atom.position.y,
                    atom.position.z,
                    atom.symbol()
                )?;
            }
            for bond in molecule.bonds() {
                writeln!(
                    writer,
                    "{:>3}{:>3}{:>3}  0",
                    bond.atom1 + 1,
                    bond.atom2 + 1,
                    bond.order.to_ctfile()
                )?;
            }
            writeln!(writer, "M  END")?;
            for (key, value) in &molecule.properties {
                writeln!(writer, ">  <{}>", key)?;
                writeln!(writer, "{}", value)?;
                writeln!(writer)?;
            }
            writeln!(writer, "$$$$")?;
        }
        Ok(())
    }
}

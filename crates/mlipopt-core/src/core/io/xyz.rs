use super::Format;
use super::error::Error;
use super::traits::MolecularFile;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Plain (multi-frame) XYZ files.
///
/// Line 2 of every frame is kept as the molecule title, and whitespace-separated
/// `key=value` tokens found on it are also exposed through `Molecule::properties`.
pub struct XyzFile;

/// Extracts `key=value` tokens from an XYZ comment line.
pub fn parse_comment_properties(comment: &str) -> BTreeMap<String, String> {
    comment
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.trim_matches('"').to_string()))
        .collect()
}

fn parse_element(token: &str, line: usize) -> Result<Element, Error> {
    let element = match token.parse::<u8>() {
        Ok(z) => Element::from_atomic_number(z),
        Err(_) => Element::from_symbol(token),
    };
    element.ok_or_else(|| {
        Error::parse(
            Format::Xyz,
            line,
            format!("unknown element symbol '{}'", token),
        )
    })
}

fn parse_coordinate(token: Option<&str>, axis: char, line: usize) -> Result<f64, Error> {
    let token = token.ok_or_else(|| {
        Error::parse(
            Format::Xyz,
            line,
            format!("atom line is missing the {} coordinate", axis),
        )
    })?;
    token.parse::<f64>().map_err(|_| {
        Error::parse(
            Format::Xyz,
            line,
            format!("invalid {} coordinate '{}'", axis, token),
        )
    })
}

impl MolecularFile for XyzFile {
    type Error = Error;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|content| (i + 1, content)));
        let mut molecules = Vec::new();

        while let Some(next) = lines.next() {
            let (count_line, content) = next?;
            if content.trim().is_empty() {
                continue;
            }

            let count_token = content.split_whitespace().next().unwrap_or_default();
            let atom_count: usize = count_token.parse().map_err(|_| {
                Error::parse(
                    Format::Xyz,
                    count_line,
                    format!("invalid atom count '{}'", count_token),
                )
            })?;

            let (_, comment) = lines.next().transpose()?.ok_or_else(|| {
                Error::parse(Format::Xyz, count_line + 1, "missing comment line")
            })?;

            let mut molecule = Molecule::new(comment.trim());
            molecule.properties = parse_comment_properties(&comment);

            for expected in 0..atom_count {
                let (line_no, atom_line) = lines.next().transpose()?.ok_or_else(|| {
                    Error::parse(
                        Format::Xyz,
                        count_line + 2 + expected,
                        format!(
                            "frame ended after {} of {} atoms",
                            expected, atom_count
                        ),
                    )
                })?;
                let mut tokens = atom_line.split_whitespace();
                let symbol = tokens
                    .next()
                    .ok_or_else(|| Error::parse(Format::Xyz, line_no, "empty atom line"))?;
                let element = parse_element(symbol, line_no)?;
                let x = parse_coordinate(tokens.next(), 'x', line_no)?;
                let y = parse_coordinate(tokens.next(), 'y', line_no)?;
                let z = parse_coordinate(tokens.next(), 'z', line_no)?;
                molecule.add_atom(element, Point3::new(x, y, z));
            }

            molecules.push(molecule);
        }

        if molecules.is_empty() {
            return Err(Error::Empty(Format::Xyz));
        }
        Ok(molecules)
    }

    fn write_to(molecules: &[Molecule], writer: &mut impl Write) -> Result<(), Self::Error> {
        for molecule in molecules {
            writeln!(writer, "{}", molecule.len())?;
            writeln!(writer, "{}", molecule.title.replace(['\n', '\r'], " "))?;
            for atom in molecule.atoms() {
                writeln!(
                    writer,
                    "{:<2} {:>15.8} {:>15.8} {:>15.8}",
                    atom.symbol(),
                    atom.position.x,
                    atom.position.y,
                    atom.position.z
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(content: &str) -> Result<Vec<Molecule>, Error> {
        XyzFile::read_from(&mut Cursor::new(content))
    }

    #[test]
    fn reads_single_frame_with_comment() {
        let mols = read("3\nwater molecule\nO 0.0 0.0 0.0\nH 0.757 0.586 0.0\nh -0.757 0.586 0.0\n")
            .unwrap();
        assert_eq!(mols.len(), 1);
        let mol = &mols[0];
        assert_eq!(mol.title, "water molecule");
        assert_eq!(mol.symbols(), vec!["O", "H", "H"]);
        assert_eq!(mol.atom(2).unwrap().position, Point3::new(-0.757, 0.586, 0.0));
    }

    #[test]
    fn reads_multiple_frames_separated_by_blank_lines() {
        let content = "2\nframe 1\nH 0 0 0\nH 0 0 0.74\n\n2\nframe 2\nH 0 0 0\nH 0 0 0.80\n";
        let mols = read(content).unwrap();
        assert_eq!(mols.len(), 2);
        assert_eq!(mols[1].title, "frame 2");
        assert_eq!(mols[1].atom(1).unwrap().position.z, 0.80);
    }

    #[test]
    fn accepts_atomic_numbers_and_extra_columns() {
        let mols = read("1\n\n6 1.0 2.0 3.0 0.1 0.2 0.3\n").unwrap();
        assert_eq!(mols[0].symbols(), vec!["C"]);
        assert!(mols[0].title.is_empty());
    }

    #[test]
    fn comment_properties_are_parsed() {
        let mols = read("1\nenergy=-12.5 eV charge=0.0 spin=1.0\nHe 0 0 0\n").unwrap();
        let props = &mols[0].properties;
        assert_eq!(props.get("energy").map(String::as_str), Some("-12.5"));
        assert_eq!(props.get("charge").map(String::as_str), Some("0.0"));
        assert_eq!(props.get("spin").map(String::as_str), Some("1.0"));
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn truncated_frame_reports_line() {
        let err = read("3\ncomment\nO 0 0 0\nH 1 0 0\n").unwrap_err();
        match err {
            Error::Parse { line, details, .. } => {
                assert_eq!(line, 5);
                assert!(details.contains("2 of 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_count_and_coordinates_are_rejected() {
        assert!(matches!(
            read("three\ncomment\n").unwrap_err(),
            Error::Parse { line: 1, .. }
        ));
        assert!(matches!(
            read("1\ncomment\nC 0.0 abc 0.0\n").unwrap_err(),
            Error::Parse { line: 3, .. }
        ));
        assert!(matches!(
            read("1\ncomment\nC 0.0 0.0\n").unwrap_err(),
            Error::Parse { line: 3, .. }
        ));
        assert!(matches!(
            read("1\ncomment\nZz 0.0 0.0 0.0\n").unwrap_err(),
            Error::Parse { line: 3, .. }
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(read("\n\n").unwrap_err(), Error::Empty(Format::Xyz)));
    }

    #[test]
    fn writer_uses_fixed_width_columns() {
        let mut mol = Molecule::new("energy=-1.000000 eV charge=0.0 spin=1.0");
        mol.add_atom(Element::from_symbol("C").unwrap(), Point3::new(1.0, -2.5, 0.125));
        let mut out = Vec::new();
        XyzFile::write_to(&[mol], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "1");
        assert_eq!(lines[1], "energy=-1.000000 eV charge=0.0 spin=1.0");
        assert_eq!(
            lines[2],
            "C       1.00000000     -2.50000000      0.12500000"
        );
    }
}

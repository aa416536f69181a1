use super::atom::Atom;
use super::element::Element;
use super::topology::{Bond, BondOrder};
use nalgebra::{DVector, Point3};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Bond references atom {index} but the molecule has {len} atoms")]
    BondOutOfRange { index: usize, len: usize },
    #[error("Bond connects atom {0} to itself")]
    SelfBond(usize),
    #[error("Expected {expected} positions but received {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },
}

/// A single molecular structure: atoms, optional connectivity, a title line, and free-form
/// key/value properties carried through file I/O.
///
/// Atoms are addressed by their 0-based position; bonds refer to those positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    /// Title or comment line (xyz line 2, sdf header line 1).
    pub title: String,
    /// Key/value annotations (parsed `key=value` comment tokens or sdf data items).
    pub properties: BTreeMap<String, String>,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn add_atom(&mut self, element: Element, position: Point3<f64>) -> usize {
        self.atoms.push(Atom::new(element, position));
        self.atoms.len() - 1
    }

    /// Adds a bond between two existing atoms.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is outside the atom list or both indices are equal.
    pub fn add_bond(
        &mut self,
        atom1: usize,
        atom2: usize,
        order: BondOrder,
    ) -> Result<(), MoleculeError> {
        let len = self.atoms.len();
        for index in [atom1, atom2] {
            if index >= len {
                return Err(MoleculeError::BondOutOfRange { index, len });
            }
        }
        if atom1 == atom2 {
            return Err(MoleculeError::SelfBond(atom1));
        }
        self.bonds.push(Bond::new(atom1, atom2, order));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn symbols(&self) -> Vec<&'static str> {
        self.atoms.iter().map(Atom::symbol).collect()
    }

    pub fn atomic_numbers(&self) -> Vec<u8> {
        self.atoms.iter().map(|a| a.element.atomic_number()).collect()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Replaces all atomic positions, keeping elements and connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::PositionCountMismatch`] if the slice length differs from the
    /// atom count.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), MoleculeError> {
        if positions.len() != self.atoms.len() {
            return Err(MoleculeError::PositionCountMismatch {
                expected: self.atoms.len(),
                actual: positions.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Ok(())
    }

    /// Coordinates flattened as `[x1, y1, z1, x2, ...]`.
    pub fn flat_positions(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.atoms.len() * 3,
            self.atoms
                .iter()
                .flat_map(|a| [a.position.x, a.position.y, a.position.z]),
        )
    }

    /// Copy of this molecule without its title and properties.
    pub fn stripped(&self) -> Self {
        Self {
            title: String::new(),
            properties: BTreeMap::new(),
            atoms: self.atoms.clone(),
            bonds: self.bonds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        let o = Element::from_symbol("O").unwrap();
        let h = Element::from_symbol("H").unwrap();
        let mut mol = Molecule::new("water");
        mol.add_atom(o, Point3::new(0.0, 0.0, 0.0));
        mol.add_atom(h, Point3::new(0.757, 0.586, 0.0));
        mol.add_atom(h, Point3::new(-0.757, 0.586, 0.0));
        mol
    }

    #[test]
    fn accessors_report_atoms_in_insertion_order() {
        let mol = water();
        assert_eq!(mol.len(), 3);
        assert!(!mol.is_empty());
        assert_eq!(mol.symbols(), vec!["O", "H", "H"]);
        assert_eq!(mol.atomic_numbers(), vec![8, 1, 1]);
        assert_eq!(mol.atom(1).unwrap().position, Point3::new(0.757, 0.586, 0.0));
        assert!(mol.atom(3).is_none());
    }

    #[test]
    fn add_bond_validates_indices() {
        let mut mol = water();
        assert!(mol.add_bond(0, 1, BondOrder::Single).is_ok());
        assert_eq!(
            mol.add_bond(0, 3, BondOrder::Single),
            Err(MoleculeError::BondOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            mol.add_bond(2, 2, BondOrder::Single),
            Err(MoleculeError::SelfBond(2))
        );
        assert_eq!(mol.bonds().len(), 1);
    }

    #[test]
    fn set_positions_requires_matching_length() {
        let mut mol = water();
        let shifted: Vec<_> = mol
            .positions()
            .iter()
            .map(|p| p + nalgebra::Vector3::new(1.0, 0.0, 0.0))
            .collect();
        mol.set_positions(&shifted).unwrap();
        assert_eq!(mol.atom(0).unwrap().position, Point3::new(1.0, 0.0, 0.0));

        let err = mol.set_positions(&shifted[..2]).unwrap_err();
        assert_eq!(
            err,
            MoleculeError::PositionCountMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn flat_positions_interleaves_coordinates() {
        let mol = water();
        let flat = mol.flat_positions();
        assert_eq!(flat.len(), 9);
        assert_eq!(flat[3], 0.757);
        assert_eq!(flat[4], 0.586);
        assert_eq!(flat[6], -0.757);
    }

    #[test]
    fn stripped_drops_title_and_properties() {
        let mut mol = water();
        mol.properties.insert("energy".into(), "-1.0".into());
        let stripped = mol.stripped();
        assert!(stripped.title.is_empty());
        assert!(stripped.properties.is_empty());
        assert_eq!(stripped.positions(), mol.positions());
    }
}

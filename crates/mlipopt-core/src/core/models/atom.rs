use super::element::Element;
use nalgebra::Point3;

/// An atom of a molecule: its element and Cartesian position in Angstroms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The chemical element of the atom.
    pub element: Element,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` at the given position.
    ///
    /// # Arguments
    ///
    /// * `element` - The chemical element.
    /// * `position` - The 3D coordinates in Angstroms.
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self { element, position }
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol()
    }
}

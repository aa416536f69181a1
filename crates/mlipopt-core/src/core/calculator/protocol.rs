//! Wire format spoken with calculator worker processes: one JSON object per line.

use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub symbols: Vec<&'static str>,
    pub numbers: Vec<u8>,
    pub positions: Vec<[f64; 3]>,
    pub charge: f64,
    pub spin: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

impl<'a> Request<'a> {
    pub fn new(molecule: &'a Molecule, state: &ElectronicState) -> Self {
        Self {
            symbols: molecule.symbols(),
            numbers: molecule.atomic_numbers(),
            positions: molecule
                .atoms()
                .iter()
                .map(|a| [a.position.x, a.position.y, a.position.z])
                .collect(),
            charge: state.charge,
            spin: state.spin,
            title: (!molecule.title.is_empty()).then_some(molecule.title.as_str()),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Success { energy: f64, forces: Vec<[f64; 3]> },
    Failure { error: String },
}

pub fn force_vectors(forces: &[[f64; 3]]) -> Vec<Vector3<f64>> {
    forces.iter().map(|f| Vector3::new(f[0], f[1], f[2])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    #[test]
    fn request_serializes_geometry_and_state() {
        let mut mol = Molecule::new("");
        mol.add_atom(Element::from_symbol("O").unwrap(), Point3::new(0.0, 0.0, 0.1));
        mol.add_atom(Element::from_symbol("H").unwrap(), Point3::new(0.0, 0.7, -0.5));
        let state = ElectronicState::new(-1.0, 2.0);

        let json = serde_json::to_value(Request::new(&mol, &state)).unwrap();
        assert_eq!(json["symbols"], serde_json::json!(["O", "H"]));
        assert_eq!(json["numbers"], serde_json::json!([8, 1]));
        assert_eq!(json["positions"][1], serde_json::json!([0.0, 0.7, -0.5]));
        assert_eq!(json["charge"], serde_json::json!(-1.0));
        assert_eq!(json["spin"], serde_json::json!(2.0));
        assert!(json.get("title").is_none());
    }

    #[test]
    fn response_distinguishes_success_and_failure() {
        let ok: Response =
            serde_json::from_str(r#"{"energy": -2.5, "forces": [[0.0, 0.1, 0.2]]}"#).unwrap();
        assert_eq!(
            ok,
            Response::Success {
                energy: -2.5,
                forces: vec![[0.0, 0.1, 0.2]]
            }
        );

        let err: Response = serde_json::from_str(r#"{"error": "CUDA out of memory"}"#).unwrap();
        assert_eq!(
            err,
            Response::Failure {
                error: "CUDA out of memory".to_string()
            }
        );

        assert!(serde_json::from_str::<Response>(r#"{"energy": 1.0}"#).is_err());
    }
}

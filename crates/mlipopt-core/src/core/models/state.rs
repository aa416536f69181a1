/// The electronic state a structure is evaluated in.
///
/// `spin` is the spin multiplicity 2S+1. Both values are kept as floats because the
/// potential receives them as floats and they are echoed into output comments verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectronicState {
    pub charge: f64,
    pub spin: f64,
}

impl Default for ElectronicState {
    fn default() -> Self {
        Self {
            charge: 0.0,
            spin: 1.0,
        }
    }
}

impl ElectronicState {
    pub fn new(charge: f64, spin: f64) -> Self {
        Self { charge, spin }
    }

    /// Net charge rounded to the nearest integer, as external programs expect.
    pub fn integer_charge(&self) -> i32 {
        self.charge.round() as i32
    }

    /// Number of unpaired electrons implied by the multiplicity (2S = multiplicity - 1).
    pub fn unpaired_electrons(&self) -> u32 {
        (self.spin - 1.0).round().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_neutral_singlet() {
        let state = ElectronicState::default();
        assert_eq!(state.charge, 0.0);
        assert_eq!(state.spin, 1.0);
        assert_eq!(state.unpaired_electrons(), 0);
    }

    #[test]
    fn integer_views_round_values() {
        let state = ElectronicState::new(-1.0, 3.0);
        assert_eq!(state.integer_charge(), -1);
        assert_eq!(state.unpaired_electrons(), 2);

        let doublet = ElectronicState::new(0.9999, 2.0);
        assert_eq!(doublet.integer_charge(), 1);
        assert_eq!(doublet.unpaired_electrons(), 1);
    }

    #[test]
    fn multiplicity_below_one_has_no_unpaired_electrons() {
        assert_eq!(ElectronicState::new(0.0, 0.0).unpaired_electrons(), 0);
    }
}

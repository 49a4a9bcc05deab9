//! Static donor → recipient blood type compatibility scores.

use super::domain::BloodType;
use BloodType::{
    AbNegative, AbPositive, ANegative, APositive, BNegative, BPositive, ONegative, OPositive,
};

/// Score awarded when the donor type exactly matches the requirement.
pub const MAX_COMPATIBILITY: u8 = 30;

fn donor_row(donor: BloodType) -> &'static [(BloodType, u8)] {
    match donor {
        OPositive => &[
            (OPositive, 30),
            (APositive, 25),
            (BPositive, 25),
            (AbPositive, 20),
            (ONegative, 15),
            (ANegative, 10),
            (BNegative, 10),
            (AbNegative, 5),
        ],
        ONegative => &[
            (ONegative, 30),
            (OPositive, 25),
            (ANegative, 20),
            (BNegative, 20),
            (AbNegative, 15),
            (APositive, 10),
            (BPositive, 10),
            (AbPositive, 5),
        ],
        APositive => &[
            (APositive, 30),
            (AbPositive, 25),
            (ANegative, 20),
            (AbNegative, 15),
            (OPositive, 10),
            (ONegative, 5),
        ],
        ANegative => &[
            (ANegative, 30),
            (APositive, 25),
            (AbNegative, 20),
            (AbPositive, 15),
            (ONegative, 10),
            (OPositive, 5),
        ],
        BPositive => &[
            (BPositive, 30),
            (AbPositive, 25),
            (BNegative, 20),
            (AbNegative, 15),
            (OPositive, 10),
            (ONegative, 5),
        ],
        BNegative => &[
            (BNegative, 30),
            (BPositive, 25),
            (AbNegative, 20),
            (AbPositive, 15),
            (ONegative, 10),
            (OPositive, 5),
        ],
        AbPositive => &[
            (AbPositive, 30),
            (AbNegative, 25),
            (APositive, 20),
            (BPositive, 20),
            (ANegative, 15),
            (BNegative, 15),
            (OPositive, 10),
            (ONegative, 5),
        ],
        AbNegative => &[
            (AbNegative, 30),
            (AbPositive, 25),
            (ANegative, 20),
            (BNegative, 20),
            (APositive, 15),
            (BPositive, 15),
            (ONegative, 10),
            (OPositive, 5),
        ],
    }
}

/// Compatibility of `donor` blood for a `required` type, 0 (incompatible) to 30.
pub fn compatibility(donor: BloodType, required: BloodType) -> u8 {
    donor_row(donor)
        .iter()
        .find(|(recipient, _)| *recipient == required)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

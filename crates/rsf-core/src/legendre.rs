//! Order-zero Legendre polynomials and the axisymmetric harmonic Y_l^0.

use std::f64::consts::PI;

/// P_l(x) via Bonnet's recurrence: (k+1) P_{k+1} = (2k+1) x P_k - k P_{k-1}.
pub fn legendre_p(l: u32, x: f64) -> f64 {
    match l {
        0 => 1.0,
        1 => x,
        _ => {
            let mut prev = 1.0;
            let mut curr = x;
            for k in 1..l {
                let k = k as f64;
                let next = ((2.0 * k + 1.0) * x * curr - k * prev) / (k + 1.0);
                prev = curr;
                curr = next;
            }
            curr
        }
    }
}

/// Real, normalized Y_l^0(θ) as a function of cos θ:
/// sqrt((2l+1)/4π) · P_l(cos θ)
pub fn y_l0(l: u32, cos_theta: f64) -> f64 {
    let norm = ((2.0 * l as f64 + 1.0) / (4.0 * PI)).sqrt();
    norm * legendre_p(l, cos_theta)
}

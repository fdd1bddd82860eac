//! Butcher tableaus and step-size controllers.
//!
//! Stage `i` is evaluated at `t + c[i]*h` on `y + h * sum_j a[i][j] * k_j`,
//! so `a[i]` holds at most `i` entries. `b` weights propagate the solution;
//! `b_alt` weights give the embedded estimate whose difference from the
//! propagated one is the local error.

use odesim_core::Real;

use crate::config::AdaptiveBounds;

/// Step-length proposal rule for an embedded pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controller {
    pub safety: Real,
    pub exponent: Real,
    /// Limits on `h_new / h`, when present.
    pub scale_limits: Option<(Real, Real)>,
}

impl Controller {
    /// `0.9 * h * ratio^(1/5)`, for the 4(5) and 5(4) pairs.
    pub const FIFTH_ORDER: Controller = Controller {
        safety: 0.9,
        exponent: 0.2,
        scale_limits: None,
    };

    /// `h * clamp(0.8 * ratio^(1/7), 0.125, 4)`, for the 7(8) pair.
    pub const SEVENTH_ORDER: Controller = Controller {
        safety: 0.8,
        exponent: 1.0 / 7.0,
        scale_limits: Some((0.125, 4.0)),
    };

    /// `h * clamp(0.8 * ratio^(1/8), 0.125, 4)`, for the 8(7) pair.
    pub const EIGHTH_ORDER: Controller = Controller {
        safety: 0.8,
        exponent: 1.0 / 8.0,
        scale_limits: Some((0.125, 4.0)),
    };

    /// New step length from the attempted one and `ratio = tolerance / max|err|`.
    /// The result always lies within `[bounds.min, bounds.max]`.
    pub fn propose(&self, h: Real, ratio: Real, bounds: &AdaptiveBounds) -> Real {
        let mut scale = self.safety * ratio.powf(self.exponent).abs();
        if let Some((lo, hi)) = self.scale_limits {
            scale = scale.max(lo).min(hi);
        }
        (h * scale).max(bounds.min).min(bounds.max)
    }
}

#[derive(Debug)]
pub struct Tableau {
    pub name: &'static str,
    pub c: &'static [Real],
    pub a: &'static [&'static [Real]],
    pub b: &'static [Real],
    pub b_alt: Option<&'static [Real]>,
    pub controller: Option<Controller>,
}

impl Tableau {
    pub fn stages(&self) -> usize {
        self.c.len()
    }

    pub fn is_embedded(&self) -> bool {
        self.b_alt.is_some() && self.controller.is_some()
    }
}

pub static RK4: Tableau = Tableau {
    name: "rk4",
    c: &[0.0, 0.5, 0.5, 1.0],
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    b_alt: None,
    controller: None,
};

/// Fehlberg 4(5), propagating the 5th-order solution.
pub static RKF45: Tableau = Tableau {
    name: "rkf45",
    c: &[0.0, 0.25, 3.0 / 8.0, 12.0 / 13.0, 1.0, 0.5],
    a: &[
        &[],
        &[0.25],
        &[3.0 / 32.0, 9.0 / 32.0],
        &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
        &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
        &[-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
    ],
    b: &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
    b_alt: Some(&[
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -0.2,
        0.0,
    ]),
    controller: Some(Controller::FIFTH_ORDER),
};

/// Dormand-Prince 5(4). The seventh stage is evaluated on the propagated
/// solution and only feeds the embedded estimate.
pub static DORMAND_PRINCE: Tableau = Tableau {
    name: "dormand_prince",
    c: &[0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0],
    a: &[
        &[],
        &[0.2],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
        &[
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_alt: Some(&[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ]),
    controller: Some(Controller::FIFTH_ORDER),
};

/// Fehlberg 7(8), NASA TR R-287 Table X. Propagates the weights on stages
/// 0 and 10; the local error is `41/840 * h * (k0 + k10 - k11 - k12)`.
pub static RKF78: Tableau = Tableau {
    name: "rkf78",
    c: &[
        0.0,
        2.0 / 27.0,
        1.0 / 9.0,
        1.0 / 6.0,
        5.0 / 12.0,
        0.5,
        5.0 / 6.0,
        1.0 / 6.0,
        2.0 / 3.0,
        1.0 / 3.0,
        1.0,
        0.0,
        1.0,
    ],
    a: &[
        &[],
        &[2.0 / 27.0],
        &[1.0 / 36.0, 1.0 / 12.0],
        &[1.0 / 24.0, 0.0, 1.0 / 8.0],
        &[5.0 / 12.0, 0.0, -25.0 / 16.0, 25.0 / 16.0],
        &[1.0 / 20.0, 0.0, 0.0, 0.25, 0.2],
        &[-25.0 / 108.0, 0.0, 0.0, 125.0 / 108.0, -65.0 / 27.0, 125.0 / 54.0],
        &[31.0 / 300.0, 0.0, 0.0, 0.0, 61.0 / 225.0, -2.0 / 9.0, 13.0 / 900.0],
        &[2.0, 0.0, 0.0, -53.0 / 6.0, 704.0 / 45.0, -107.0 / 9.0, 67.0 / 90.0, 3.0],
        &[
            -91.0 / 108.0,
            0.0,
            0.0,
            23.0 / 108.0,
            -976.0 / 135.0,
            311.0 / 54.0,
            -19.0 / 60.0,
            17.0 / 6.0,
            -1.0 / 12.0,
        ],
        &[
            2383.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -301.0 / 82.0,
            2133.0 / 4100.0,
            45.0 / 82.0,
            45.0 / 164.0,
            18.0 / 41.0,
        ],
        &[
            3.0 / 205.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -6.0 / 41.0,
            -3.0 / 205.0,
            -3.0 / 41.0,
            3.0 / 41.0,
            6.0 / 41.0,
            0.0,
        ],
        &[
            -1777.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -289.0 / 82.0,
            2193.0 / 4100.0,
            51.0 / 82.0,
            33.0 / 164.0,
            12.0 / 41.0,
            0.0,
            1.0,
        ],
    ],
    b: &[
        41.0 / 840.0,
        0.0,
        0.0,
        0.0,
        0.0,
        34.0 / 105.0,
        9.0 / 35.0,
        9.0 / 35.0,
        9.0 / 280.0,
        9.0 / 280.0,
        41.0 / 840.0,
        0.0,
        0.0,
    ],
    b_alt: Some(&[
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        34.0 / 105.0,
        9.0 / 35.0,
        9.0 / 35.0,
        9.0 / 280.0,
        9.0 / 280.0,
        0.0,
        41.0 / 840.0,
        41.0 / 840.0,
    ]),
    controller: Some(Controller::SEVENTH_ORDER),
};

/// Prince-Dormand 8(7) "RK8(7)13M", propagating the 8th-order solution.
#[rustfmt::skip]
pub static RK87: Tableau = Tableau {
    name: "rk87",
    c: &[
        0.0,
        1.0 / 18.0,
        1.0 / 12.0,
        1.0 / 8.0,
        5.0 / 16.0,
        3.0 / 8.0,
        59.0 / 400.0,
        93.0 / 200.0,
        5490023248.0 / 9719169821.0,
        13.0 / 20.0,
        1201146811.0 / 1299019798.0,
        1.0,
        1.0,
    ],
    a: &[
        &[],
        &[1.0/18.0],
        &[1.0/48.0, 1.0/16.0],
        &[1.0/32.0, 0.0, 3.0/32.0],
        &[5.0/16.0, 0.0, -75.0/64.0, 75.0/64.0],
        &[3.0/80.0, 0.0, 0.0, 3.0/16.0, 3.0/20.0],
        &[29443841.0/614563906.0, 0.0, 0.0, 77736538.0/692538347.0, -28693883.0/1125000000.0, 23124283.0/1800000000.0],
        &[16016141.0/946692911.0, 0.0, 0.0, 61564180.0/158732637.0, 22789713.0/633445777.0, 545815736.0/2771057229.0, -180193667.0/1043307555.0],
        &[39632708.0/573591083.0, 0.0, 0.0, -433636366.0/683701615.0, -421739975.0/2616292301.0, 100302831.0/723423059.0, 790204164.0/839813087.0, 800635310.0/3783071287.0],
        &[246121993.0/1340847787.0, 0.0, 0.0, -37695042795.0/15268766246.0, -309121744.0/1061227803.0, -12992083.0/490766935.0, 6005943493.0/2108947869.0, 393006217.0/1396673457.0, 123872331.0/1001029789.0],
        &[-1028468189.0/846180014.0, 0.0, 0.0, 8478235783.0/508512852.0, 1311729495.0/1432422823.0, -10304129995.0/1701304382.0, -48777925059.0/3047939560.0, 15336726248.0/1032824649.0, -45442868181.0/3398467696.0, 3065993473.0/597172653.0],
        &[185892177.0/718116043.0, 0.0, 0.0, -3185094517.0/667107341.0, -477755414.0/1098053517.0, -703635378.0/230739211.0, 5731566787.0/1027545527.0, 5232866602.0/850066563.0, -4093664535.0/808688257.0, 3962137247.0/1805957418.0, 65686358.0/487910083.0],
        &[403863854.0/491063109.0, 0.0, 0.0, -5068492393.0/434740067.0, -411421997.0/543043805.0, 652783627.0/914296604.0, 11173962825.0/925320556.0, -13158990841.0/6184727034.0, 3936647629.0/1978049680.0, -160528059.0/685178525.0, 248638103.0/1413531060.0, 0.0],
    ],
    b: &[
        14005451.0/335480064.0, 0.0, 0.0, 0.0, 0.0, -59238493.0/1068277825.0,
        181606767.0/758867731.0, 561292985.0/797845732.0, -1041891430.0/1371343529.0,
        760417239.0/1151165299.0, 118820643.0/751138087.0, -528747749.0/2220607170.0, 0.25,
    ],
    b_alt: Some(&[
        13451932.0/455176623.0, 0.0, 0.0, 0.0, 0.0, -808719846.0/976000145.0,
        1757004468.0/5645159321.0, 656045339.0/265891186.0, -3867574721.0/1518517206.0,
        465885868.0/322736535.0, 53011238.0/667516719.0, 2.0/45.0, 0.0,
    ]),
    controller: Some(Controller::EIGHTH_ORDER),
};

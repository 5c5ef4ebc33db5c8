use super::{Derivative, PartialDerivative};
use num_dual::{Dual2_64, Dual3_64, Dual64, HyperDual64};
use std::cmp::{max, min};
use std::collections::HashMap;

/// Cache for partial derivatives of the residual Helmholtz energy.
///
/// Whenever a derivative is evaluated with a (hyper-) dual number, the
/// real part and all lower derivatives come along for free and are
/// stored as well.
#[derive(Clone, Debug)]
pub(crate) struct Cache {
    map: HashMap<PartialDerivative, f64>,
    pub hit: u64,
    pub miss: u64,
}

impl Cache {
    pub fn new() -> Self {
        // 1 value, 3 first, 6 second and 3 third derivatives
        Self {
            map: HashMap::with_capacity(13),
            hit: 0,
            miss: 0,
        }
    }

    fn lookup(&mut self, key: PartialDerivative) -> Option<f64> {
        let cached = self.map.get(&key).copied();
        match cached {
            Some(_) => self.hit += 1,
            None => self.miss += 1,
        }
        cached
    }

    fn fill(&mut self, slots: &[(PartialDerivative, f64)]) {
        for &(key, value) in slots {
            self.map.insert(key, value);
        }
    }

    pub fn get_or_insert_with_f64<F: FnOnce() -> f64>(&mut self, f: F) -> f64 {
        if let Some(value) = self.lookup(PartialDerivative::Zeroth) {
            return value;
        }
        let fresh = f();
        self.fill(&[(PartialDerivative::Zeroth, fresh)]);
        fresh
    }

    pub fn get_or_insert_with_d64<F: FnOnce() -> Dual64>(
        &mut self,
        derivative: Derivative,
        f: F,
    ) -> f64 {
        if let Some(value) = self.lookup(PartialDerivative::First(derivative)) {
            return value;
        }
        let fresh = f();
        self.fill(&[
            (PartialDerivative::Zeroth, fresh.re),
            (PartialDerivative::First(derivative), fresh.eps),
        ]);
        fresh.eps
    }

    pub fn get_or_insert_with_d2_64<F: FnOnce() -> Dual2_64>(
        &mut self,
        derivative: Derivative,
        f: F,
    ) -> f64 {
        if let Some(value) = self.lookup(PartialDerivative::Second(derivative, derivative)) {
            return value;
        }
        let fresh = f();
        self.fill(&[
            (PartialDerivative::Zeroth, fresh.re),
            (PartialDerivative::First(derivative), fresh.v1),
            (PartialDerivative::Second(derivative, derivative), fresh.v2),
        ]);
        fresh.v2
    }

    pub fn get_or_insert_with_hd64<F: FnOnce() -> HyperDual64>(
        &mut self,
        derivative1: Derivative,
        derivative2: Derivative,
        f: F,
    ) -> f64 {
        // mixed second derivatives are symmetric, store them under one key
        let key = PartialDerivative::Second(
            min(derivative1, derivative2),
            max(derivative1, derivative2),
        );
        if let Some(value) = self.lookup(key) {
            return value;
        }
        let fresh = f();
        self.fill(&[
            (PartialDerivative::Zeroth, fresh.re),
            (PartialDerivative::First(derivative1), fresh.eps1),
            (PartialDerivative::First(derivative2), fresh.eps2),
            (key, fresh.eps1eps2),
        ]);
        fresh.eps1eps2
    }

    pub fn get_or_insert_with_d3_64<F: FnOnce() -> Dual3_64>(
        &mut self,
        derivative: Derivative,
        f: F,
    ) -> f64 {
        if let Some(value) = self.lookup(PartialDerivative::Third(derivative)) {
            return value;
        }
        let fresh = f();
        self.fill(&[
            (PartialDerivative::Zeroth, fresh.re),
            (PartialDerivative::First(derivative), fresh.v1),
            (PartialDerivative::Second(derivative, derivative), fresh.v2),
            (PartialDerivative::Third(derivative), fresh.v3),
        ]);
        fresh.v3
    }
}

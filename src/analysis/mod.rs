// SPDX-License-Identifier: GPL-2.0

//! Control-flow analysis: block partitioning, edge construction, and the
//! acyclicity proof that licenses the single-pass interpreter.

pub mod cfg;
pub mod order;

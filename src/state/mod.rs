// SPDX-License-Identifier: GPL-2.0

//! Abstract state: the value domain and the per-block register file.

pub mod reg_file;
pub mod value;

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Synchronization scenarios.

mod availability;
mod deletion;
mod instances;
mod template;

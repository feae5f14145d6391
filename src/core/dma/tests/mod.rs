// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! DMA engine tests

mod helpers;

#![allow(dead_code)]

pub mod graphs;
pub mod single;
pub mod virtual_network;

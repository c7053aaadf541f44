pub mod kubevirt;

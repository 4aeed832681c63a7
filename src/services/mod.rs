pub mod dataset;
pub mod gazetteer;

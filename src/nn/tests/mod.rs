mod models;
mod tangent;

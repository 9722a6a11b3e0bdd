mod test_mesh_basic;
mod test_triangulation_basic;

mod spatial_index_test;

mod processor_tests;
mod boundary_props;

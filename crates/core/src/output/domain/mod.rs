pub mod output_sink;

pub mod duplex_chan;

use std::{
    io,
    net::{Ipv4Addr, TcpListener},
};

use crate::errors::SupervisorError;

pub fn allocate_free_port() -> Result<u16, SupervisorError> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(SupervisorError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(SupervisorError::PortAllocation)?
        .port();
    drop(listener);
    checked_port(port)
}

fn checked_port(port: u16) -> Result<u16, SupervisorError> {
    if port == 0 {
        return Err(SupervisorError::PortAllocation(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "OS assigned port 0 to the loopback listener",
        )));
    }
    Ok(port)
}

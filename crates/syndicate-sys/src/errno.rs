//! POSIX errno lookup table.
//!
//! Native UG calls report failure as a negative errno. The high-level API
//! negates the return code and resolves it here to build error messages.

use std::borrow::Cow;

/// One row of the errno table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrnoInfo {
    pub errno: i32,
    pub code: &'static str,
    pub description: &'static str,
}

impl ErrnoInfo {
    const fn new(errno: i32, code: &'static str, description: &'static str) -> Self {
        Self {
            errno,
            code,
            description,
        }
    }
}

/// Linux errno values, sorted by number.
///
/// `EWOULDBLOCK` and `EDEADLOCK` are aliases and resolve to `EAGAIN` and
/// `EDEADLK`.
pub static ERRNO_TABLE: &[ErrnoInfo] = &[
    ErrnoInfo::new(1, "EPERM", "Operation not permitted"),
    ErrnoInfo::new(2, "ENOENT", "No such file or directory"),
    ErrnoInfo::new(3, "ESRCH", "No such process"),
    ErrnoInfo::new(4, "EINTR", "Interrupted system call"),
    ErrnoInfo::new(5, "EIO", "I/O error"),
    ErrnoInfo::new(6, "ENXIO", "No such device or address"),
    ErrnoInfo::new(7, "E2BIG", "Argument list too long"),
    ErrnoInfo::new(8, "ENOEXEC", "Exec format error"),
    ErrnoInfo::new(9, "EBADF", "Bad file number"),
    ErrnoInfo::new(10, "ECHILD", "No child processes"),
    ErrnoInfo::new(11, "EAGAIN", "Try again"),
    ErrnoInfo::new(12, "ENOMEM", "Out of memory"),
    ErrnoInfo::new(13, "EACCES", "Permission denied"),
    ErrnoInfo::new(14, "EFAULT", "Bad address"),
    ErrnoInfo::new(15, "ENOTBLK", "Block device required"),
    ErrnoInfo::new(16, "EBUSY", "Device or resource busy"),
    ErrnoInfo::new(17, "EEXIST", "File exists"),
    ErrnoInfo::new(18, "EXDEV", "Cross-device link"),
    ErrnoInfo::new(19, "ENODEV", "No such device"),
    ErrnoInfo::new(20, "ENOTDIR", "Not a directory"),
    ErrnoInfo::new(21, "EISDIR", "Is a directory"),
    ErrnoInfo::new(22, "EINVAL", "Invalid argument"),
    ErrnoInfo::new(23, "ENFILE", "File table overflow"),
    ErrnoInfo::new(24, "EMFILE", "Too many open files"),
    ErrnoInfo::new(25, "ENOTTY", "Not a typewriter"),
    ErrnoInfo::new(26, "ETXTBSY", "Text file busy"),
    ErrnoInfo::new(27, "EFBIG", "File too large"),
    ErrnoInfo::new(28, "ENOSPC", "No space left on device"),
    ErrnoInfo::new(29, "ESPIPE", "Illegal seek"),
    ErrnoInfo::new(30, "EROFS", "Read-only file system"),
    ErrnoInfo::new(31, "EMLINK", "Too many links"),
    ErrnoInfo::new(32, "EPIPE", "Broken pipe"),
    ErrnoInfo::new(33, "EDOM", "Math argument out of domain of func"),
    ErrnoInfo::new(34, "ERANGE", "Math result not representable"),
    ErrnoInfo::new(35, "EDEADLK", "Resource deadlock would occur"),
    ErrnoInfo::new(36, "ENAMETOOLONG", "File name too long"),
    ErrnoInfo::new(37, "ENOLCK", "No record locks available"),
    ErrnoInfo::new(38, "ENOSYS", "Function not implemented"),
    ErrnoInfo::new(39, "ENOTEMPTY", "Directory not empty"),
    ErrnoInfo::new(40, "ELOOP", "Too many symbolic links encountered"),
    ErrnoInfo::new(42, "ENOMSG", "No message of desired type"),
    ErrnoInfo::new(43, "EIDRM", "Identifier removed"),
    ErrnoInfo::new(44, "ECHRNG", "Channel number out of range"),
    ErrnoInfo::new(45, "EL2NSYNC", "Level 2 not synchronized"),
    ErrnoInfo::new(46, "EL3HLT", "Level 3 halted"),
    ErrnoInfo::new(47, "EL3RST", "Level 3 reset"),
    ErrnoInfo::new(48, "ELNRNG", "Link number out of range"),
    ErrnoInfo::new(49, "EUNATCH", "Protocol driver not attached"),
    ErrnoInfo::new(50, "ENOCSI", "No CSI structure available"),
    ErrnoInfo::new(51, "EL2HLT", "Level 2 halted"),
    ErrnoInfo::new(52, "EBADE", "Invalid exchange"),
    ErrnoInfo::new(53, "EBADR", "Invalid request descriptor"),
    ErrnoInfo::new(54, "EXFULL", "Exchange full"),
    ErrnoInfo::new(55, "ENOANO", "No anode"),
    ErrnoInfo::new(56, "EBADRQC", "Invalid request code"),
    ErrnoInfo::new(57, "EBADSLT", "Invalid slot"),
    ErrnoInfo::new(59, "EBFONT", "Bad font file format"),
    ErrnoInfo::new(60, "ENOSTR", "Device not a stream"),
    ErrnoInfo::new(61, "ENODATA", "No data available"),
    ErrnoInfo::new(62, "ETIME", "Timer expired"),
    ErrnoInfo::new(63, "ENOSR", "Out of streams resources"),
    ErrnoInfo::new(64, "ENONET", "Machine is not on the network"),
    ErrnoInfo::new(65, "ENOPKG", "Package not installed"),
    ErrnoInfo::new(66, "EREMOTE", "Object is remote"),
    ErrnoInfo::new(67, "ENOLINK", "Link has been severed"),
    ErrnoInfo::new(68, "EADV", "Advertise error"),
    ErrnoInfo::new(69, "ESRMNT", "Srmount error"),
    ErrnoInfo::new(70, "ECOMM", "Communication error on send"),
    ErrnoInfo::new(71, "EPROTO", "Protocol error"),
    ErrnoInfo::new(72, "EMULTIHOP", "Multihop attempted"),
    ErrnoInfo::new(73, "EDOTDOT", "RFS specific error"),
    ErrnoInfo::new(74, "EBADMSG", "Not a data message"),
    ErrnoInfo::new(75, "EOVERFLOW", "Value too large for defined data type"),
    ErrnoInfo::new(76, "ENOTUNIQ", "Name not unique on network"),
    ErrnoInfo::new(77, "EBADFD", "File descriptor in bad state"),
    ErrnoInfo::new(78, "EREMCHG", "Remote address changed"),
    ErrnoInfo::new(79, "ELIBACC", "Can not access a needed shared library"),
    ErrnoInfo::new(80, "ELIBBAD", "Accessing a corrupted shared library"),
    ErrnoInfo::new(81, "ELIBSCN", ".lib section in a.out corrupted"),
    ErrnoInfo::new(82, "ELIBMAX", "Attempting to link in too many shared libraries"),
    ErrnoInfo::new(83, "ELIBEXEC", "Cannot exec a shared library directly"),
    ErrnoInfo::new(84, "EILSEQ", "Illegal byte sequence"),
    ErrnoInfo::new(85, "ERESTART", "Interrupted system call should be restarted"),
    ErrnoInfo::new(86, "ESTRPIPE", "Streams pipe error"),
    ErrnoInfo::new(87, "EUSERS", "Too many users"),
    ErrnoInfo::new(88, "ENOTSOCK", "Socket operation on non-socket"),
    ErrnoInfo::new(89, "EDESTADDRREQ", "Destination address required"),
    ErrnoInfo::new(90, "EMSGSIZE", "Message too long"),
    ErrnoInfo::new(91, "EPROTOTYPE", "Protocol wrong type for socket"),
    ErrnoInfo::new(92, "ENOPROTOOPT", "Protocol not available"),
    ErrnoInfo::new(93, "EPROTONOSUPPORT", "Protocol not supported"),
    ErrnoInfo::new(94, "ESOCKTNOSUPPORT", "Socket type not supported"),
    ErrnoInfo::new(95, "EOPNOTSUPP", "Operation not supported on transport endpoint"),
    ErrnoInfo::new(96, "EPFNOSUPPORT", "Protocol family not supported"),
    ErrnoInfo::new(97, "EAFNOSUPPORT", "Address family not supported by protocol"),
    ErrnoInfo::new(98, "EADDRINUSE", "Address already in use"),
    ErrnoInfo::new(99, "EADDRNOTAVAIL", "Cannot assign requested address"),
    ErrnoInfo::new(100, "ENETDOWN", "Network is down"),
    ErrnoInfo::new(101, "ENETUNREACH", "Network is unreachable"),
    ErrnoInfo::new(102, "ENETRESET", "Network dropped connection because of reset"),
    ErrnoInfo::new(103, "ECONNABORTED", "Software caused connection abort"),
    ErrnoInfo::new(104, "ECONNRESET", "Connection reset by peer"),
    ErrnoInfo::new(105, "ENOBUFS", "No buffer space available"),
    ErrnoInfo::new(106, "EISCONN", "Transport endpoint is already connected"),
    ErrnoInfo::new(107, "ENOTCONN", "Transport endpoint is not connected"),
    ErrnoInfo::new(108, "ESHUTDOWN", "Cannot send after transport endpoint shutdown"),
    ErrnoInfo::new(109, "ETOOMANYREFS", "Too many references: cannot splice"),
    ErrnoInfo::new(110, "ETIMEDOUT", "Connection timed out"),
    ErrnoInfo::new(111, "ECONNREFUSED", "Connection refused"),
    ErrnoInfo::new(112, "EHOSTDOWN", "Host is down"),
    ErrnoInfo::new(113, "EHOSTUNREACH", "No route to host"),
    ErrnoInfo::new(114, "EALREADY", "Operation already in progress"),
    ErrnoInfo::new(115, "EINPROGRESS", "Operation now in progress"),
    ErrnoInfo::new(116, "ESTALE", "Stale NFS file handle"),
    ErrnoInfo::new(117, "EUCLEAN", "Structure needs cleaning"),
    ErrnoInfo::new(118, "ENOTNAM", "Not a XENIX named type file"),
    ErrnoInfo::new(119, "ENAVAIL", "No XENIX semaphores available"),
    ErrnoInfo::new(120, "EISNAM", "Is a named type file"),
    ErrnoInfo::new(121, "EREMOTEIO", "Remote I/O error"),
    ErrnoInfo::new(122, "EDQUOT", "Quota exceeded"),
    ErrnoInfo::new(123, "ENOMEDIUM", "No medium found"),
    ErrnoInfo::new(124, "EMEDIUMTYPE", "Wrong medium type"),
    ErrnoInfo::new(125, "ECANCELED", "Operation Canceled"),
    ErrnoInfo::new(126, "ENOKEY", "Required key not available"),
    ErrnoInfo::new(127, "EKEYEXPIRED", "Key has expired"),
    ErrnoInfo::new(128, "EKEYREVOKED", "Key has been revoked"),
    ErrnoInfo::new(129, "EKEYREJECTED", "Key was rejected by service"),
    ErrnoInfo::new(130, "EOWNERDEAD", "Owner died"),
    ErrnoInfo::new(131, "ENOTRECOVERABLE", "State not recoverable"),
];

/// Find the table row for a positive errno.
pub fn lookup(errno: i32) -> Option<&'static ErrnoInfo> {
    ERRNO_TABLE
        .binary_search_by_key(&errno, |e| e.errno)
        .ok()
        .map(|idx| &ERRNO_TABLE[idx])
}

/// Human-readable description of `errno`.
pub fn strerror(errno: i32) -> Cow<'static, str> {
    match lookup(errno) {
        Some(info) => Cow::Borrowed(info.description),
        None => Cow::Owned(format!("UNKNOWN ERROR - {}", errno)),
    }
}

/// Symbolic name (`"ENOENT"`) of `errno`, if known.
pub fn code(errno: i32) -> Option<&'static str> {
    lookup(errno).map(|e| e.code)
}

/// Convert a native return code into a positive errno.
///
/// UG functions return `-errno`; some paths hand back a bare positive value.
/// Both map to the same errno. `i32::MIN` saturates.
#[inline]
pub fn from_return_code(rc: i64) -> i32 {
    let abs = rc.unsigned_abs();
    i32::try_from(abs).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_unique() {
        for pair in ERRNO_TABLE.windows(2) {
            assert!(pair[0].errno < pair[1].errno, "{:?} >= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_table_matches_libc() {
        assert_eq!(lookup(libc::ENOENT).unwrap().code, "ENOENT");
        assert_eq!(lookup(libc::EEXIST).unwrap().code, "EEXIST");
        assert_eq!(lookup(libc::EIO).unwrap().code, "EIO");
        assert_eq!(lookup(libc::ENOTEMPTY).unwrap().code, "ENOTEMPTY");
        assert_eq!(lookup(libc::ENODATA).unwrap().code, "ENODATA");
        assert_eq!(lookup(libc::ENOTRECOVERABLE).unwrap().code, "ENOTRECOVERABLE");
    }

    #[test]
    fn test_strerror_known() {
        assert_eq!(strerror(2), "No such file or directory");
        assert_eq!(strerror(17), "File exists");
    }

    #[test]
    fn test_strerror_unknown_contains_code() {
        assert_eq!(strerror(9999), "UNKNOWN ERROR - 9999");
        assert!(strerror(0).contains('0'));
        // Aliases are not rows of their own.
        assert!(lookup(41).is_none());
        assert!(strerror(58).contains("58"));
    }

    #[test]
    fn test_every_negative_return_code_is_described() {
        for rc in -200i64..0 {
            let errno = from_return_code(rc);
            let desc = strerror(errno);
            assert!(!desc.is_empty());
            if lookup(errno).is_none() {
                assert!(desc.contains(&errno.to_string()));
            }
        }
    }

    #[test]
    fn test_from_return_code() {
        assert_eq!(from_return_code(-17), 17);
        assert_eq!(from_return_code(5), 5);
        assert_eq!(from_return_code(i64::MIN), i32::MAX);
    }
}

//! Concurrent installs for the same `name@version` run the install body at
//! most once; every other caller observes the same outcome (spec §8
//! invariant 2, scenario B).

use std::sync::Arc;
use std::time::Duration;

use aperture_installer::{InstallPolicy, InstallRequest, Installer, InstallerError};

#[tokio::test]
async fn concurrent_installs_of_the_same_identity_share_one_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let installer = Arc::new(Installer::new(
        dir.path().to_path_buf(),
        Duration::from_secs(5),
        InstallPolicy { package_whitelist: Vec::new(), dangerous_name_blacklist: vec!["rm".into()] },
    ));

    let first = {
        let installer = Arc::clone(&installer);
        tokio::spawn(async move {
            let request = InstallRequest::new("rm", "1.0.0", "npm:rm@1.0.0").unwrap();
            installer.install(request, true).await
        })
    };
    let second = {
        let installer = Arc::clone(&installer);
        tokio::spawn(async move {
            let request = InstallRequest::new("rm", "1.0.0", "npm:rm@1.0.0").unwrap();
            installer.install(request, true).await
        })
    };

    let (first, second) = tokio::join!(first, second);
    let first = first.unwrap().unwrap_err();
    let second = second.unwrap().unwrap_err();
    assert!(matches!(first, InstallerError::Blacklisted(_)));
    assert!(matches!(second, InstallerError::Blacklisted(_)));

    // A distinct identity is unaffected by the blacklisted one's dedup lock.
    let allowed = InstallRequest::new("other-server", "2.0.0", "npm:other-server@2.0.0").unwrap();
    let err = installer.install(allowed, true).await.unwrap_err();
    assert!(!matches!(err, InstallerError::AlreadyInstalling(_)));
}

use crate::core::parser::UuidRegistry;
use crate::core::xml::{
    child, child_text, children, descendant, element_xpath, local_name, path_text, source_line,
    text_of,
};
use crate::domain::interface::{
    ArgumentDirection, DataElement, DataType, DataTypeCategory, Interface, InterfaceMethod,
    InterfaceType, MethodArgument,
};
use crate::domain::model::last_segment;
use roxmltree::Node;

/// Builds an `Interface` from any `*-INTERFACE` element.
pub fn parse_interface(
    node: Node<'_, '_>,
    package_path: &str,
    uuids: &mut UuidRegistry,
) -> Option<Interface> {
    let tag = local_name(node);
    let Some(short_name) = child_text(node, "SHORT-NAME") else {
        tracing::debug!("Skipping {} without SHORT-NAME", tag);
        return None;
    };

    let mut interface = Interface::new(short_name, InterfaceType::from_tag(tag));
    interface.uuid = uuids.assign(node);
    interface.desc = path_text(node, "DESC/L-2");
    interface.category = child_text(node, "CATEGORY");
    interface.package_path = Some(package_path.to_string());
    interface.is_service_interface = child_text(node, "IS-SERVICE")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    interface.xml_path = Some(element_xpath(node));
    interface.source_line = Some(source_line(node));

    match interface.interface_type {
        InterfaceType::SenderReceiver => {
            parse_data_elements(node, "DATA-ELEMENTS", &mut interface);
        }
        InterfaceType::NvData => {
            parse_data_elements(node, "NV-DATAS", &mut interface);
        }
        InterfaceType::ClientServer => {
            if let Some(operations) = child(node, "OPERATIONS") {
                for op in children(operations, "CLIENT-SERVER-OPERATION") {
                    if let Some(method) = parse_operation(op) {
                        add_method(&mut interface, method);
                    }
                }
            }
        }
        InterfaceType::Trigger => {
            if let Some(triggers) = child(node, "TRIGGERS") {
                for trigger in children(triggers, "TRIGGER") {
                    if let Some(name) = child_text(trigger, "SHORT-NAME") {
                        let mut method = InterfaceMethod::new(name);
                        method.description = path_text(trigger, "DESC/L-2");
                        add_method(&mut interface, method);
                    }
                }
            }
        }
        InterfaceType::ModeSwitch => {
            let groups = node.descendants().filter(|n| {
                n.is_element()
                    && matches!(
                        local_name(*n),
                        "MODE-GROUP"
                            | "MODE-DECLARATION-GROUP"
                            | "MODE-DECLARATION-GROUP-PROTOTYPE"
                    )
            });
            for group in groups {
                if let Some(name) = child_text(group, "SHORT-NAME") {
                    let mut element = DataElement::new(
                        name,
                        DataType::new("ModeType", DataTypeCategory::Enum),
                    );
                    element.data_type.type_reference = child_text(group, "TYPE-TREF");
                    element.description = path_text(group, "DESC/L-2");
                    add_data_element(&mut interface, element);
                }
            }
        }
    }

    Some(interface)
}

fn parse_data_elements(node: Node<'_, '_>, container: &str, interface: &mut Interface) {
    let Some(container) = child(node, container) else {
        return;
    };
    for prototype in children(container, "VARIABLE-DATA-PROTOTYPE") {
        let Some(name) = child_text(prototype, "SHORT-NAME") else {
            continue;
        };
        let mut element = DataElement::new(name, data_type_from(prototype));
        element.description = path_text(prototype, "DESC/L-2");
        element.default_value = descendant(prototype, "INIT-VALUE").and_then(|init| {
            init.descendants()
                .find(|n| n.is_element() && matches!(local_name(*n), "V" | "VALUE"))
                .and_then(text_of)
        });
        add_data_element(interface, element);
    }
}

fn parse_operation(op: Node<'_, '_>) -> Option<InterfaceMethod> {
    let name = child_text(op, "SHORT-NAME")?;
    let mut method = InterfaceMethod::new(name);
    method.description = path_text(op, "DESC/L-2");

    if let Some(arguments) = child(op, "ARGUMENTS") {
        for arg in children(arguments, "ARGUMENT-DATA-PROTOTYPE") {
            let Some(arg_name) = child_text(arg, "SHORT-NAME") else {
                continue;
            };
            method.arguments.push(MethodArgument {
                name: arg_name,
                data_type: data_type_from(arg),
                direction: child_text(arg, "DIRECTION")
                    .map(|d| ArgumentDirection::parse(&d))
                    .unwrap_or(ArgumentDirection::In),
                description: path_text(arg, "DESC/L-2"),
            });
        }
    }

    if let Some(errors) = child(op, "POSSIBLE-ERROR-REFS") {
        method.possible_errors = children(errors, "POSSIBLE-ERROR-REF")
            .filter_map(text_of)
            .map(|r| last_segment(&r).to_string())
            .collect();
    }

    Some(method)
}

fn data_type_from(node: Node<'_, '_>) -> DataType {
    match child_text(node, "TYPE-TREF") {
        Some(reference) => {
            let name = last_segment(&reference).to_string();
            let mut data_type = DataType::new(name.clone(), DataTypeCategory::guess(&name));
            data_type.type_reference = Some(reference);
            data_type
        }
        None => DataType::unknown(),
    }
}

fn add_method(interface: &mut Interface, method: InterfaceMethod) {
    let name = method.name.clone();
    if !interface.add_method(method) {
        tracing::debug!(
            "Duplicate method '{}' in interface '{}' ignored",
            name,
            interface.short_name
        );
    }
}

fn add_data_element(interface: &mut Interface, element: DataElement) {
    let name = element.name.clone();
    if !interface.add_data_element(element) {
        tracing::debug!(
            "Duplicate data element '{}' in interface '{}' ignored",
            name,
            interface.short_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Interface {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let mut uuids = UuidRegistry::default();
        parse_interface(doc.root_element(), "/Interfaces", &mut uuids).unwrap()
    }

    #[test]
    fn test_sender_receiver_interface() {
        let intf = parse(
            r#"<SENDER-RECEIVER-INTERFACE UUID="sr-1">
                 <SHORT-NAME>SpeedIf</SHORT-NAME>
                 <IS-SERVICE>false</IS-SERVICE>
                 <DATA-ELEMENTS>
                   <VARIABLE-DATA-PROTOTYPE>
                     <SHORT-NAME>Speed</SHORT-NAME>
                     <TYPE-TREF DEST="IMPLEMENTATION-DATA-TYPE">/Types/uint16</TYPE-TREF>
                     <INIT-VALUE><NUMERICAL-VALUE-SPECIFICATION><VALUE>0</VALUE></NUMERICAL-VALUE-SPECIFICATION></INIT-VALUE>
                   </VARIABLE-DATA-PROTOTYPE>
                   <VARIABLE-DATA-PROTOTYPE>
                     <SHORT-NAME>Speed</SHORT-NAME>
                   </VARIABLE-DATA-PROTOTYPE>
                 </DATA-ELEMENTS>
               </SENDER-RECEIVER-INTERFACE>"#,
        );
        assert_eq!(intf.uuid, "sr-1");
        assert_eq!(intf.interface_type, InterfaceType::SenderReceiver);
        assert_eq!(intf.data_element_count(), 1);
        assert_eq!(intf.data_elements[0].type_name(), "uint16");
        assert_eq!(intf.full_path(), "/Interfaces/SpeedIf");
        assert!(!intf.is_service_interface);
    }

    #[test]
    fn test_client_server_interface() {
        let intf = parse(
            r#"<CLIENT-SERVER-INTERFACE>
                 <SHORT-NAME>DiagIf</SHORT-NAME>
                 <IS-SERVICE>true</IS-SERVICE>
                 <OPERATIONS>
                   <CLIENT-SERVER-OPERATION>
                     <SHORT-NAME>ReadDtc</SHORT-NAME>
                     <ARGUMENTS>
                       <ARGUMENT-DATA-PROTOTYPE>
                         <SHORT-NAME>code</SHORT-NAME>
                         <TYPE-TREF>/Types/uint32</TYPE-TREF>
                         <DIRECTION>OUT</DIRECTION>
                       </ARGUMENT-DATA-PROTOTYPE>
                       <ARGUMENT-DATA-PROTOTYPE>
                         <SHORT-NAME>index</SHORT-NAME>
                         <TYPE-TREF>/Types/uint8</TYPE-TREF>
                       </ARGUMENT-DATA-PROTOTYPE>
                     </ARGUMENTS>
                     <POSSIBLE-ERROR-REFS>
                       <POSSIBLE-ERROR-REF>/Interfaces/DiagIf/E_NOT_OK</POSSIBLE-ERROR-REF>
                     </POSSIBLE-ERROR-REFS>
                   </CLIENT-SERVER-OPERATION>
                 </OPERATIONS>
               </CLIENT-SERVER-INTERFACE>"#,
        );
        assert!(intf.is_client_server());
        assert!(intf.is_service_interface);
        let method = intf.method_by_name("ReadDtc").unwrap();
        assert_eq!(method.arguments[0].direction, ArgumentDirection::Out);
        assert_eq!(method.arguments[1].direction, ArgumentDirection::In);
        assert_eq!(method.possible_errors, vec!["E_NOT_OK"]);
        assert_eq!(method.signature(), "ReadDtc(code: uint32, index: uint8)");
    }

    #[test]
    fn test_mode_switch_and_trigger() {
        let modes = parse(
            r#"<MODE-SWITCH-INTERFACE>
                 <SHORT-NAME>EcuModeIf</SHORT-NAME>
                 <MODE-GROUP><SHORT-NAME>EcuMode</SHORT-NAME></MODE-GROUP>
               </MODE-SWITCH-INTERFACE>"#,
        );
        assert_eq!(modes.data_elements[0].type_name(), "ModeType");

        let triggers = parse(
            r#"<TRIGGER-INTERFACE>
                 <SHORT-NAME>TickIf</SHORT-NAME>
                 <TRIGGERS><TRIGGER><SHORT-NAME>Tick</SHORT-NAME></TRIGGER></TRIGGERS>
               </TRIGGER-INTERFACE>"#,
        );
        assert_eq!(triggers.method_count(), 1);
    }
}
